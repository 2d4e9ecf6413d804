use crate::crd::{ConditionStatus, ConnectionState, ProviderStatus, SyncState};

#[test]
fn condition_status_default_is_unknown() {
    assert_eq!(ConditionStatus::default(), ConditionStatus::Unknown);
}

#[test]
fn sync_state_default_is_pending() {
    assert_eq!(SyncState::default(), SyncState::Pending);
}

#[test]
fn provider_status_requires_authoritative_daemon() {
    let mut status = ProviderStatus {
        connection_state: ConnectionState::Connected,
        daemon_type: Some("recursor".into()),
        ..Default::default()
    };
    assert!(!status.is_healthy());
    status.daemon_type = Some("authoritative".into());
    assert!(status.is_healthy());
}
