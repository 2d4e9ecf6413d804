use super::*;

#[test]
fn reconcile_needed_on_first_observation() {
    assert!(should_reconcile(Some(1), None));
}

#[test]
fn reconcile_skipped_when_generation_matches() {
    assert!(!should_reconcile(Some(2), Some(2)));
}

#[test]
fn reconcile_needed_when_generation_advanced() {
    assert!(should_reconcile(Some(3), Some(2)));
}

#[test]
fn status_changed_detects_difference() {
    assert!(status_changed(&Some(1), &Some(2)));
    assert!(!status_changed(&Some(1), &Some(1)));
}
