//! Custom resource definitions: `Provider`, `Zone`, `ClusterZone`, `RRset`,
//! `ClusterRRset`.
//!
//! Zone/`ClusterZone` and RRset/`ClusterRRset` deliberately share one
//! `*Spec`/`*Status` pair each — only the top-level `#[derive(CustomResource)]`
//! container differs in scope (namespaced vs cluster-wide). This is the
//! concrete expression of the "polymorphism over scope" design note: the
//! reconcilers are written once against a trait (see `reconcilers::zone`,
//! `reconcilers::rrset`) implemented by both containers.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single status condition, shared verbatim across every kind this
/// operator manages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    #[serde(rename = "lastTransitionTime", skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
    #[serde(rename = "observedGeneration", skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl Default for ConditionStatus {
    fn default() -> Self {
        ConditionStatus::Unknown
    }
}

/// The condition type every reconciler writes to summarize reconcile health.
pub const CONDITION_AVAILABLE: &str = "Available";

/// The operator's summary of whether a resource matches backend reality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum SyncState {
    #[default]
    Pending,
    Succeeded,
    Failed,
}

// ---------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CaBundleKind {
    ConfigMap,
    Secret,
}

/// Reference to a CA bundle stored in a ConfigMap or Secret key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaBundleRef {
    pub name: String,
    pub namespace: String,
    pub kind: CaBundleKind,
    #[serde(default = "default_ca_bundle_key")]
    pub key: String,
}

fn default_ca_bundle_key() -> String {
    crate::constants::DEFAULT_CA_BUNDLE_KEY.to_string()
}

/// TLS options for the backend HTTP transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TlsConfig {
    #[serde(default, rename = "insecureSkipVerify")]
    pub insecure_skip_verify: bool,
    #[serde(default, rename = "caBundle", skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<CaBundleRef>,
}

/// Reference to a namespaced Secret key holding the PowerDNS API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SecretKeyRef {
    pub name: String,
    pub namespace: String,
    #[serde(default = "default_api_key_field")]
    pub key: String,
}

fn default_api_key_field() -> String {
    crate::constants::DEFAULT_API_KEY_FIELD.to_string()
}

fn default_vhost() -> String {
    crate::constants::DEFAULT_VHOST.to_string()
}

const fn default_timeout_seconds() -> u32 {
    crate::constants::DEFAULT_TIMEOUT_SECS as u32
}

const fn default_reconcile_interval_seconds() -> u32 {
    crate::constants::DEFAULT_RECONCILE_INTERVAL_SECS as u32
}

#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.cav.enablers.ob",
    version = "v1alpha2",
    kind = "Provider",
    shortname = "pdnsprovider",
    status = "ProviderStatus",
    printcolumn = r#"{"name":"URL", "type":"string", "jsonPath":".spec.url"}"#,
    printcolumn = r#"{"name":"Connection", "type":"string", "jsonPath":".status.connectionState"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
// NOTE: No 'namespaced' attribute = cluster-scoped.
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_vhost")]
    pub vhost: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub tls: TlsConfig,
    pub credentials: SecretKeyRef,
    #[serde(default = "default_reconcile_interval_seconds")]
    pub reconcile_interval_seconds: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ConnectionState {
    #[default]
    Failed,
    Connected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    #[serde(default)]
    pub connection_state: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daemon_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connection_time: Option<Time>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl ProviderStatus {
    pub fn is_healthy(&self) -> bool {
        self.connection_state == ConnectionState::Connected
            && self.daemon_type.as_deref() == Some("authoritative")
    }
}

// ---------------------------------------------------------------------
// Zone / ClusterZone
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DnsKind {
    #[default]
    Native,
    Master,
    Slave,
    Producer,
    Consumer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SoaEditApi {
    #[default]
    Default,
    Increase,
    Epoch,
}

/// A cluster-scoped reference to a `Provider` object by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProviderRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSpec {
    #[serde(default)]
    pub kind: DnsKind,
    /// Must contain at least one entry; each entry must be a FQDN ending
    /// with a trailing dot, validated by the CRD OpenAPI schema.
    #[schemars(inner(regex(
        pattern = r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.$"
    )))]
    pub nameservers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, rename = "soaEditApi")]
    pub soa_edit_api: SoaEditApi,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_ref: Option<ProviderRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DnsKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_serial: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_serial: Option<i64>,
    #[serde(default)]
    pub dnssec: bool,
    #[serde(default)]
    pub masters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, rename = "syncStatus")]
    pub sync_status: SyncState,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.cav.enablers.ob",
    version = "v1alpha2",
    kind = "Zone",
    namespaced,
    shortname = "zn",
    status = "ZoneStatus",
    printcolumn = r#"{"name":"Serial", "type":"integer", "jsonPath":".status.serial"}"#,
    printcolumn = r#"{"name":"Id", "type":"string", "jsonPath":".status.id"}"#,
    printcolumn = r#"{"name":"SyncStatus", "type":"string", "jsonPath":".status.syncStatus"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ZoneCrdSpec {
    #[serde(flatten)]
    pub common: ZoneSpec,
}

// ClusterZone intentionally re-flattens the same `ZoneSpec` fields: the two
// kinds differ only in scope (namespaced vs cluster-wide), never in shape.
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.cav.enablers.ob",
    version = "v1alpha2",
    kind = "ClusterZone",
    shortname = "czn",
    status = "ZoneStatus",
    printcolumn = r#"{"name":"Serial", "type":"integer", "jsonPath":".status.serial"}"#,
    printcolumn = r#"{"name":"Id", "type":"string", "jsonPath":".status.id"}"#,
    printcolumn = r#"{"name":"SyncStatus", "type":"string", "jsonPath":".status.syncStatus"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
// NOTE: No 'namespaced' attribute = cluster-scoped.
#[serde(rename_all = "camelCase")]
pub struct ClusterZoneCrdSpec {
    #[serde(flatten)]
    pub common: ZoneSpec,
}

// ---------------------------------------------------------------------
// RRset / ClusterRRset
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ParentKind {
    Zone,
    ClusterZone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParentRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub kind: ParentKind,
}

fn default_ttl() -> i64 {
    crate::constants::DEFAULT_NS_TTL_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RRsetSpec {
    /// One of A, AAAA, CNAME, MX, TXT, PTR, SRV, NS, CAA, ...
    pub record_type: String,
    /// Short (possibly empty or relative) name; combined with the parent
    /// zone's name to compute `status.dnsEntryName`.
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_ttl")]
    pub ttl: i64,
    pub records: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub parent_ref: ParentRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RRsetStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_entry_name: Option<String>,
    #[serde(default, rename = "syncStatus")]
    pub sync_status: SyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.cav.enablers.ob",
    version = "v1alpha2",
    kind = "RRset",
    namespaced,
    shortname = "rrs",
    status = "RRsetStatus",
    printcolumn = r#"{"name":"FQDN", "type":"string", "jsonPath":".status.dnsEntryName"}"#,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.recordType"}"#,
    printcolumn = r#"{"name":"SyncStatus", "type":"string", "jsonPath":".status.syncStatus"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RRsetCrdSpec {
    #[serde(flatten)]
    pub common: RRsetSpec,
}

#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.cav.enablers.ob",
    version = "v1alpha2",
    kind = "ClusterRRset",
    shortname = "crrs",
    status = "RRsetStatus",
    printcolumn = r#"{"name":"FQDN", "type":"string", "jsonPath":".status.dnsEntryName"}"#,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.recordType"}"#,
    printcolumn = r#"{"name":"SyncStatus", "type":"string", "jsonPath":".status.syncStatus"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
// NOTE: No 'namespaced' attribute = cluster-scoped.
#[serde(rename_all = "camelCase")]
pub struct ClusterRRsetCrdSpec {
    #[serde(flatten)]
    pub common: RRsetSpec,
}

