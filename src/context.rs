//! Shared reconciler context: the kube client plus one reflector [`Store`]
//! per CRD kind, queried in place of extra API calls (§4.4 uniqueness
//! indexer).

use kube::runtime::reflector::Store;
use kube::Client;

use crate::crd::{ClusterRRset, ClusterZone, Provider, RRset, SyncState, Zone};
use crate::powerdns::client::canonicalize_domain;

pub struct Context {
    pub client: Client,
    pub stores: Stores,
}

#[derive(Clone)]
pub struct Stores {
    pub providers: Store<Provider>,
    pub zones: Store<Zone>,
    pub cluster_zones: Store<ClusterZone>,
    pub rrsets: Store<RRset>,
    pub cluster_rrsets: Store<ClusterRRset>,
}

/// Identifies one of the two concrete containers a zone-name uniqueness
/// check has to consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneOwner {
    Zone,
    ClusterZone,
}

/// One entry in the FQDN uniqueness index: which object currently claims
/// the name, and whether it has already converged.
#[derive(Debug, Clone)]
pub struct ZoneIndexEntry {
    pub owner: ZoneOwner,
    pub namespace: Option<String>,
    pub uid: Option<String>,
    pub succeeded: bool,
}

#[derive(Debug, Clone)]
pub struct RRsetIndexEntry {
    pub owner: ZoneOwner, // reused: Zone == namespaced RRset, ClusterZone == ClusterRRset
    pub namespace: Option<String>,
    pub uid: Option<String>,
    pub succeeded: bool,
}

impl Stores {
    /// Every Zone/ClusterZone claiming canonical FQDN `fqdn`, whose sync
    /// state is absent or Succeeded (Failed resources are excluded from the
    /// index per §4.4, so a deleted duplicate frees the name up again).
    pub fn zone_index_entries(&self, fqdn: &str) -> Vec<ZoneIndexEntry> {
        let mut out = Vec::new();
        for zone in self.zones.state().iter() {
            if zone_name_matches(&zone.metadata.name, fqdn) {
                out.push(ZoneIndexEntry {
                    owner: ZoneOwner::Zone,
                    namespace: zone.metadata.namespace.clone(),
                    uid: zone.metadata.uid.clone(),
                    succeeded: status_is_indexable(zone.status.as_ref().map(|s| s.sync_status)),
                });
            }
        }
        for zone in self.cluster_zones.state().iter() {
            if zone_name_matches(&zone.metadata.name, fqdn) {
                out.push(ZoneIndexEntry {
                    owner: ZoneOwner::ClusterZone,
                    namespace: None,
                    uid: zone.metadata.uid.clone(),
                    succeeded: status_is_indexable(zone.status.as_ref().map(|s| s.sync_status)),
                });
            }
        }
        out
    }

    /// Every RRset/ClusterRRset claiming `(fqdn, record_type)`, excluding
    /// Failed resources, as in [`Stores::zone_index_entries`].
    pub fn rrset_index_entries(&self, fqdn: &str, record_type: &str) -> Vec<RRsetIndexEntry> {
        let mut out = Vec::new();
        for r in self.rrsets.state().iter() {
            if let Some(status) = &r.status {
                if rrset_matches(status.dns_entry_name.as_deref(), &r.spec.common.record_type, fqdn, record_type) {
                    out.push(RRsetIndexEntry {
                        owner: ZoneOwner::Zone,
                        namespace: r.metadata.namespace.clone(),
                        uid: r.metadata.uid.clone(),
                        succeeded: status_is_indexable(Some(status.sync_status)),
                    });
                }
            }
        }
        for r in self.cluster_rrsets.state().iter() {
            if let Some(status) = &r.status {
                if rrset_matches(status.dns_entry_name.as_deref(), &r.spec.common.record_type, fqdn, record_type) {
                    out.push(RRsetIndexEntry {
                        owner: ZoneOwner::ClusterZone,
                        namespace: None,
                        uid: r.metadata.uid.clone(),
                        succeeded: status_is_indexable(Some(status.sync_status)),
                    });
                }
            }
        }
        out
    }
}

fn zone_name_matches(object_name: &Option<String>, fqdn: &str) -> bool {
    let Some(name) = object_name else { return false };
    canonicalize_domain(name).map(|c| c == fqdn).unwrap_or(false)
}

fn rrset_matches(dns_entry_name: Option<&str>, spec_type: &str, fqdn: &str, record_type: &str) -> bool {
    dns_entry_name == Some(fqdn) && spec_type.eq_ignore_ascii_case(record_type)
}

fn status_is_indexable(sync_status: Option<SyncState>) -> bool {
    !matches!(sync_status, Some(SyncState::Failed))
}
