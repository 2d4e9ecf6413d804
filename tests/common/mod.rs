//! Shared helpers for integration tests that need a real cluster.

use kube::api::{Api, DeleteParams, PostParams};
use kube::client::Client;
use serde_json::json;

/// Returns a client if a cluster is reachable, or `None` (printing why) so
/// callers can skip rather than fail. Loads a local `.env` first so
/// developers can point `KUBECONFIG` at a scratch cluster without exporting
/// it in their shell.
pub async fn get_kube_client_or_skip() -> Option<Client> {
    dotenvy::dotenv().ok();
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("skipping integration test: no reachable cluster: {e}");
            None
        }
    }
}

pub async fn create_test_namespace(client: &Client, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());
    let ns = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": name, "labels": { "test": "pdns-operator-integration" } }
    }))?;

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
        Err(e) => Err(Box::new(e)),
    }
}

pub async fn delete_test_namespace(client: &Client, name: &str) {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());
    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) | Err(kube::Error::Api(_)) => {}
        Err(e) => eprintln!("failed to delete test namespace {name}: {e}"),
    }
}
