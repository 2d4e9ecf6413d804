use super::*;

#[test]
fn socket_addr_from_env_falls_back_to_default() {
    std::env::remove_var("PDNS_OPERATOR_TEST_ADDR");
    let addr = socket_addr_from_env("PDNS_OPERATOR_TEST_ADDR", DEFAULT_METRICS_ADDR);
    assert_eq!(addr.port(), 8080);
}

#[test]
fn load_leader_election_config_defaults_enabled() {
    std::env::remove_var("OPERATOR_ENABLE_LEADER_ELECTION");
    let config = load_leader_election_config();
    assert!(config.enabled);
    assert_eq!(config.lease_duration, DEFAULT_LEASE_DURATION_SECS);
}

#[test]
fn requeue_default_matches_error_backoff() {
    // Sanity check that the error requeue constant consumed by
    // `error_policy` in every reconciler stays a positive, small value.
    assert!(ERROR_REQUEUE_SECS > 0 && ERROR_REQUEUE_SECS <= 60);
}
