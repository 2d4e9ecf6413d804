use crate::resolver::{resolve_legacy_client, ResolverError};

fn clear_legacy_env() {
    std::env::remove_var("PDNS_URL");
    std::env::remove_var("PDNS_API_KEY");
    std::env::remove_var("PDNS_VHOST");
    std::env::remove_var("PDNS_TIMEOUT_SECS");
    std::env::remove_var("PDNS_INSECURE_SKIP_VERIFY");
    std::env::remove_var("PDNS_CA_FILE");
}

#[tokio::test]
async fn legacy_client_not_configured_without_env() {
    clear_legacy_env();
    let err = resolve_legacy_client().await.unwrap_err();
    assert!(matches!(err, ResolverError::LegacyClientNotConfigured));
}

#[tokio::test]
async fn legacy_client_builds_from_env() {
    clear_legacy_env();
    std::env::set_var("PDNS_URL", "http://pdns.example.internal:8081");
    std::env::set_var("PDNS_API_KEY", "test-key");

    let backend = resolve_legacy_client().await.unwrap();
    assert_eq!(backend.vhost, crate::constants::DEFAULT_VHOST);
    assert!(backend.is_valid());

    clear_legacy_env();
}

#[tokio::test]
async fn legacy_client_rejects_missing_ca_file() {
    clear_legacy_env();
    std::env::set_var("PDNS_URL", "http://pdns.example.internal:8081");
    std::env::set_var("PDNS_API_KEY", "test-key");
    std::env::set_var("PDNS_CA_FILE", "/nonexistent/ca-bundle.pem");

    let err = resolve_legacy_client().await.unwrap_err();
    assert!(matches!(err, ResolverError::LegacyClientNotConfigured));

    clear_legacy_env();
}
