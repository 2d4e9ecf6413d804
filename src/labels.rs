//! Standard Kubernetes and operator-specific label/annotation keys.

/// Standard recommended label: the name of the application.
pub const LABEL_APP_NAME: &str = "app.kubernetes.io/name";
/// Standard recommended label: the tool managing the resource's lifecycle.
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
/// Standard recommended label: a higher-level application this is part of.
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";

/// Value used for [`LABEL_MANAGED_BY`] on every object this operator writes.
pub const MANAGED_BY_VALUE: &str = "pdns-operator";

/// Annotation recording the canonical FQDN an RRset/Zone resolved to, kept in
/// sync with `status.dnsEntryName`/`status.name` for operators grepping
/// annotations rather than status.
pub const ANNOTATION_FQDN: &str = "dns.cav.enablers.ob/fqdn";
