use super::client::{canonicalize_domain, Client};
use super::error::PowerDnsError;
use super::types::CreateZone;

#[test]
fn already_canonical() {
    assert_eq!(canonicalize_domain("example.com.").unwrap(), "example.com.");
}

#[test]
fn not_yet_canonical() {
    assert_eq!(canonicalize_domain("example.com").unwrap(), "example.com.");
}

#[test]
fn mixed_case_is_lowercased() {
    assert_eq!(canonicalize_domain("Example.COM").unwrap(), "example.com.");
}

#[test]
fn not_a_registrable_domain() {
    assert!(canonicalize_domain("com").is_err());
}

fn test_client(base_url: String) -> Client {
    let http = Client::build_http_client("test-api-key", std::time::Duration::from_secs(5), reqwest::Client::builder())
        .expect("build http client");
    Client::new(base_url, "localhost", http)
}

#[tokio::test]
async fn describe_server_decodes_body() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/api/v1/servers/localhost"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "Server",
            "id": "localhost",
            "daemon_type": "authoritative",
            "version": "4.9.0",
            "url": "/api/v1/servers/localhost",
            "config_url": "/api/v1/servers/localhost/config",
            "zones_url": "/api/v1/servers/localhost/zones",
        })))
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let info = client.describe_server().await.unwrap();
    assert_eq!(info.daemon_type, "authoritative");
    assert_eq!(info.version, "4.9.0");
}

#[tokio::test]
async fn get_zone_missing_returns_none() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/api/v1/servers/localhost/zones/example.com."))
        .respond_with(wiremock::ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    assert!(client.get_zone("example.com.").await.unwrap().is_none());
}

#[tokio::test]
async fn create_zone_surfaces_api_error_body() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/api/v1/servers/localhost/zones"))
        .respond_with(wiremock::ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "error": "Zone 'example.com.' already exists",
        })))
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    let zone = CreateZone {
        name: "example.com.".into(),
        kind: super::types::ZoneKind::Native,
        nameservers: vec!["ns1.example.com.".into()],
        dnssec: false,
        soa_edit_api: "INCEPTION-INCREMENT".into(),
        catalog: None,
    };
    let err = client.create_zone(&zone).await.unwrap_err();
    match err {
        PowerDnsError::Api { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("already exists"));
        }
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[tokio::test]
async fn delete_zone_treats_missing_as_success() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("DELETE"))
        .and(wiremock::matchers::path("/api/v1/servers/localhost/zones/example.com."))
        .respond_with(wiremock::ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(server.uri());
    assert!(client.delete_zone("example.com.").await.is_ok());
}
