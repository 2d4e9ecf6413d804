//! Provider-client resolver (§4.5): turns a `ProviderRef` (or the legacy
//! environment-configured client) into an authenticated PowerDNS [`Client`]
//! bound to `(url, vhost, key)`.

use std::time::Duration;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::Api;
use kube::Client as KubeClient;
use thiserror::Error;

use crate::crd::{CaBundleKind, Provider, ProviderRef};
use crate::powerdns;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("provider {0} not found")]
    ProviderNotFound(String),
    #[error("failed to fetch provider {0}: {1}")]
    ProviderFetchFailed(String, #[source] kube::Error),
    #[error("secret {namespace}/{name} not found or missing key {key}")]
    SecretKeyMissing { namespace: String, name: String, key: String },
    #[error("failed to fetch secret {namespace}/{name}: {source}")]
    SecretFetchFailed {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("CA bundle {kind:?} {namespace}/{name} missing key {key}")]
    CaBundleKeyMissing { kind: CaBundleKind, namespace: String, name: String, key: String },
    #[error("failed to fetch CA bundle {namespace}/{name}: {source}")]
    CaBundleFetchFailed {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("invalid CA bundle PEM data: {0}")]
    InvalidCaBundle(#[source] reqwest::Error),
    #[error("invalid proxy URL {0}: {1}")]
    InvalidProxyUrl(String, #[source] reqwest::Error),
    #[error("failed to build HTTP transport: {0}")]
    TransportBuildFailed(#[from] powerdns::PowerDnsError),
    #[error("legacy client is not configured (PDNS_URL / PDNS_API_KEY unset)")]
    LegacyClientNotConfigured,
}

/// Resolved, ready-to-use handle bundling the PowerDNS client with the vhost
/// it's bound to.
pub struct ResolvedBackend {
    pub client: powerdns::Client,
    pub vhost: String,
}

impl ResolvedBackend {
    /// Both capability sets (zones, records) live on the same `Client`, so
    /// validity just means the client constructed at all.
    pub fn is_valid(&self) -> bool {
        !self.vhost.is_empty()
    }
}

/// Resolves a `ProviderRef` to a live backend handle.
pub async fn resolve_provider_client(
    kube_client: &KubeClient,
    provider_ref: &ProviderRef,
) -> Result<ResolvedBackend, ResolverError> {
    let providers: Api<Provider> = Api::all(kube_client.clone());
    let provider = providers
        .get(&provider_ref.name)
        .await
        .map_err(|e| match &e {
            kube::Error::Api(ae) if ae.code == 404 => ResolverError::ProviderNotFound(provider_ref.name.clone()),
            _ => ResolverError::ProviderFetchFailed(provider_ref.name.clone(), e),
        })?;
    build_backend_from_provider(kube_client, &provider).await
}

/// Builds a backend handle directly from an already-fetched `Provider`
/// object (used both by [`resolve_provider_client`] and by the Provider
/// reconciler itself, which already has the object in hand).
pub async fn build_backend_from_provider(
    kube_client: &KubeClient,
    provider: &Provider,
) -> Result<ResolvedBackend, ResolverError> {
    let spec = &provider.spec;
    let api_key = load_secret_key(
        kube_client,
        &spec.credentials.namespace,
        &spec.credentials.name,
        &spec.credentials.key,
    )
    .await?;

    let mut builder = reqwest::Client::builder();
    if spec.tls.insecure_skip_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(ca_ref) = &spec.tls.ca_bundle {
        let pem = load_ca_bundle(kube_client, ca_ref).await?;
        let cert = reqwest::Certificate::from_pem(pem.as_bytes()).map_err(ResolverError::InvalidCaBundle)?;
        builder = builder.add_root_certificate(cert);
    }
    if let Some(proxy_url) = &spec.proxy_url {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ResolverError::InvalidProxyUrl(proxy_url.clone(), e))?;
        builder = builder.proxy(proxy);
    }

    let timeout = Duration::from_secs(u64::from(spec.timeout_seconds));
    let http = powerdns::Client::build_http_client(&api_key, timeout, builder)?;

    Ok(ResolvedBackend {
        client: powerdns::Client::new(spec.url.clone(), spec.vhost.clone(), http),
        vhost: spec.vhost.clone(),
    })
}

/// Legacy process-wide client, configured entirely from the environment.
/// Preferred only when no per-resource `ProviderRef` is set (§9 design note).
pub async fn resolve_legacy_client() -> Result<ResolvedBackend, ResolverError> {
    let url = std::env::var("PDNS_URL").map_err(|_| ResolverError::LegacyClientNotConfigured)?;
    let api_key = std::env::var("PDNS_API_KEY").map_err(|_| ResolverError::LegacyClientNotConfigured)?;
    let vhost = std::env::var("PDNS_VHOST").unwrap_or_else(|_| crate::constants::DEFAULT_VHOST.to_string());
    let timeout_secs: u64 = std::env::var("PDNS_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(crate::constants::DEFAULT_TIMEOUT_SECS);
    let insecure = std::env::var("PDNS_INSECURE_SKIP_VERIFY")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let mut builder = reqwest::Client::builder();
    if insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Ok(ca_path) = std::env::var("PDNS_CA_FILE") {
        let pem = tokio::fs::read(&ca_path)
            .await
            .map_err(|_| ResolverError::LegacyClientNotConfigured)?;
        let cert = reqwest::Certificate::from_pem(&pem).map_err(ResolverError::InvalidCaBundle)?;
        builder = builder.add_root_certificate(cert);
    }

    let http = powerdns::Client::build_http_client(&api_key, Duration::from_secs(timeout_secs), builder)?;
    Ok(ResolvedBackend { client: powerdns::Client::new(url, vhost.clone(), http), vhost })
}

async fn load_secret_key(
    kube_client: &KubeClient,
    namespace: &str,
    name: &str,
    key: &str,
) -> Result<String, ResolverError> {
    let secrets: Api<Secret> = Api::namespaced(kube_client.clone(), namespace);
    let secret = secrets.get(name).await.map_err(|e| match &e {
        kube::Error::Api(ae) if ae.code == 404 => ResolverError::SecretKeyMissing {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        },
        _ => ResolverError::SecretFetchFailed {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source: e,
        },
    })?;

    let value = secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|b| b.0.clone())
        .ok_or_else(|| ResolverError::SecretKeyMissing {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        })?;

    let decoded = String::from_utf8(value).map_err(|_| ResolverError::SecretKeyMissing {
        namespace: namespace.to_string(),
        name: name.to_string(),
        key: key.to_string(),
    })?;

    if decoded.is_empty() {
        return Err(ResolverError::SecretKeyMissing {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        });
    }
    Ok(decoded)
}

async fn load_ca_bundle(kube_client: &KubeClient, ca_ref: &crate::crd::CaBundleRef) -> Result<String, ResolverError> {
    match ca_ref.kind {
        CaBundleKind::ConfigMap => {
            let api: Api<ConfigMap> = Api::namespaced(kube_client.clone(), &ca_ref.namespace);
            let cm = api.get(&ca_ref.name).await.map_err(|e| ResolverError::CaBundleFetchFailed {
                namespace: ca_ref.namespace.clone(),
                name: ca_ref.name.clone(),
                source: e,
            })?;
            cm.data
                .as_ref()
                .and_then(|d| d.get(&ca_ref.key))
                .cloned()
                .ok_or_else(|| ResolverError::CaBundleKeyMissing {
                    kind: ca_ref.kind,
                    namespace: ca_ref.namespace.clone(),
                    name: ca_ref.name.clone(),
                    key: ca_ref.key.clone(),
                })
        }
        CaBundleKind::Secret => {
            let api: Api<Secret> = Api::namespaced(kube_client.clone(), &ca_ref.namespace);
            let secret = api.get(&ca_ref.name).await.map_err(|e| ResolverError::CaBundleFetchFailed {
                namespace: ca_ref.namespace.clone(),
                name: ca_ref.name.clone(),
                source: e,
            })?;
            let bytes = secret
                .data
                .as_ref()
                .and_then(|d| d.get(&ca_ref.key))
                .map(|b| b.0.clone())
                .ok_or_else(|| ResolverError::CaBundleKeyMissing {
                    kind: ca_ref.kind,
                    namespace: ca_ref.namespace.clone(),
                    name: ca_ref.name.clone(),
                    key: ca_ref.key.clone(),
                })?;
            String::from_utf8(bytes).map_err(|_| ResolverError::CaBundleKeyMissing {
                kind: ca_ref.kind,
                namespace: ca_ref.namespace.clone(),
                name: ca_ref.name.clone(),
                key: ca_ref.key.clone(),
            })
        }
    }
}

