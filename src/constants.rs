//! Shared constants: API group/version, defaults, and timing budgets.

/// CRD API group for every kind this operator manages.
pub const API_GROUP: &str = "dns.cav.enablers.ob";

/// The served+storage version. `v1alpha1` and `v1alpha3` are declared in the
/// CRD manifests generated by `crdgen` but are not observed by the
/// reconcilers (see DESIGN.md, Open Question resolution).
pub const API_VERSION: &str = "v1alpha2";

pub const KIND_PROVIDER: &str = "Provider";
pub const KIND_ZONE: &str = "Zone";
pub const KIND_CLUSTER_ZONE: &str = "ClusterZone";
pub const KIND_RRSET: &str = "RRset";
pub const KIND_CLUSTER_RRSET: &str = "ClusterRRset";

/// Default vhost/server-id PowerDNS exposes for a single-tenant install.
pub const DEFAULT_VHOST: &str = "localhost";
/// Default HTTP timeout for the PowerDNS backend client, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default secret key holding the PowerDNS API key.
pub const DEFAULT_API_KEY_FIELD: &str = "apiKey";
/// Default key under which a CA bundle ConfigMap/Secret stores its PEM data.
pub const DEFAULT_CA_BUNDLE_KEY: &str = "ca.crt";
/// Default Provider reconcile interval, in seconds (5 min).
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
/// Default NS RRset TTL used when the backend has no existing TTL to copy.
pub const DEFAULT_NS_TTL_SECS: i64 = 1500;

/// Account tag stamped on every record-level comment this operator writes,
/// so a human operator can tell operator-owned comments from user ones.
pub const COMMENT_ACCOUNT: &str = "powerdns-operator";

/// Requeue interval after a transient/backend failure, before the
/// controller-runtime's own exponential back-off takes over.
pub const ERROR_REQUEUE_SECS: u64 = 30;
/// Requeue interval used while waiting for a not-yet-created parent zone.
pub const PARENT_MISSING_REQUEUE_SECS: u64 = 2;
/// Minimum age of the last Available-condition transition before a Failed
/// resource is retried again against the backend.
pub const FAILURE_BACKOFF_SECS: i64 = 30;
/// Minimum interval between `status.lastConnectionTime` writes on an
/// unchanged connection state, to bound status-patch write amplification.
pub const CONNECTION_TIME_REFRESH_SECS: i64 = 240;

/// Finalizer token guarding backend-side cleanup, parameterized by kind.
pub fn resource_finalizer(kind_lower: &str) -> String {
    format!("{API_GROUP}/{kind_lower}-finalizer")
}

/// Finalizer token guarding in-process metrics-gauge cleanup.
pub fn metrics_finalizer(kind_lower: &str) -> String {
    format!("{API_GROUP}/{kind_lower}-metrics-finalizer")
}

/// Tokio worker thread count for the main runtime.
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default leader-election lease duration, in seconds.
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;
/// Default grace period the lease holder gets to renew before losing it.
pub const DEFAULT_LEASE_RETRY_PERIOD_SECS: u64 = 2;

/// Default bind address/port/path for the `/metrics`, `/healthz` and
/// `/readyz` HTTP server.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";
/// Default bind address/port for the dedicated health-probe listener.
pub const DEFAULT_PROBE_ADDR: &str = "0.0.0.0:8081";
