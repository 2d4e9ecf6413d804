use super::status::*;
use crate::crd::{Condition, ConditionStatus};
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

fn now() -> Time {
    Time(Utc::now())
}

#[test]
fn transition_time_preserved_on_unchanged_status() {
    let t0 = now();
    let first = create_condition("Available", ConditionStatus::True, "Synced", "ok", Some(1), None, t0.clone());
    std::thread::sleep(std::time::Duration::from_millis(2));
    let t1 = now();
    let second = create_condition(
        "Available",
        ConditionStatus::True,
        "Synced",
        "ok",
        Some(2),
        Some(&first),
        t1,
    );
    assert_eq!(first.last_transition_time, second.last_transition_time);
}

#[test]
fn transition_time_refreshed_on_status_flip() {
    let t0 = now();
    let first = create_condition("Available", ConditionStatus::False, "Failing", "bad", Some(1), None, t0.clone());
    std::thread::sleep(std::time::Duration::from_millis(2));
    let t1 = now();
    let second = create_condition(
        "Available",
        ConditionStatus::True,
        "Synced",
        "ok",
        Some(2),
        Some(&first),
        t1.clone(),
    );
    assert_eq!(second.last_transition_time, Some(t1));
    assert_ne!(first.last_transition_time, second.last_transition_time);
}

#[test]
fn condition_changed_detects_reason_change() {
    let prev = Condition {
        type_: "Available".into(),
        status: ConditionStatus::False,
        reason: "SyncFailed".into(),
        message: "x".into(),
        last_transition_time: None,
        observed_generation: None,
    };
    let mut next = prev.clone();
    assert!(!condition_changed(Some(&prev), &next));
    next.reason = "Duplicated".into();
    assert!(condition_changed(Some(&prev), &next));
}
