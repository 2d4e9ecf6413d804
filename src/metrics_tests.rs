use crate::crd::SyncState;
use crate::metrics::{gather_metrics, remove_rrset_status, remove_zone_status, set_rrset_status, set_zone_status};

#[test]
fn zone_status_partial_match_deletion() {
    set_zone_status("example.com", "ns1", SyncState::Pending);
    set_zone_status("example.com", "ns1", SyncState::Succeeded);
    let rendered = gather_metrics().unwrap();
    assert!(rendered.contains(r#"status="Succeeded""#));
    // Pending must have been removed, not left stale at 1.
    let pending_line = rendered
        .lines()
        .find(|l| l.contains(r#"name="example.com""#) && l.contains(r#"status="Pending""#));
    assert!(pending_line.is_none());
    remove_zone_status("example.com", "ns1");
}

#[test]
fn rrset_status_round_trip() {
    set_rrset_status("web.example.com.", "A", "web", "ns1", SyncState::Succeeded);
    let rendered = gather_metrics().unwrap();
    assert!(rendered.contains(r#"fqdn="web.example.com.""#));
    remove_rrset_status("web.example.com.", "A", "web", "ns1");
}
