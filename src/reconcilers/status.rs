//! Status-condition helpers shared by every reconciler.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use crate::crd::{Condition, ConditionStatus};

/// Builds a fresh `Available` condition, copying `last_transition_time`
/// forward when the effective status hasn't changed from `previous` (so
/// `LastTransitionTime` only moves when status truly flips), else stamping
/// `now`.
pub fn create_condition(
    type_: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
    previous: Option<&Condition>,
    now: Time,
) -> Condition {
    let last_transition_time = match previous {
        Some(prev) if prev.status == status => prev.last_transition_time.clone(),
        _ => Some(now),
    };
    Condition {
        type_: type_.to_string(),
        status,
        reason: reason.to_string(),
        message: message.to_string(),
        last_transition_time,
        observed_generation,
    }
}

pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

pub fn condition_changed(previous: Option<&Condition>, next: &Condition) -> bool {
    match previous {
        Some(prev) => prev.status != next.status || prev.reason != next.reason || prev.message != next.message,
        None => true,
    }
}

pub fn get_last_transition_time(conditions: &[Condition], type_: &str) -> Option<Time> {
    find_condition(conditions, type_).and_then(|c| c.last_transition_time.clone())
}

