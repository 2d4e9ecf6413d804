//! Zone / `ClusterZone` reconciler (§4.2), implemented once against the
//! [`ZoneLike`] capability trait and instantiated for both concrete kinds,
//! since the two differ only in whether their `Api<Self>` is namespaced or
//! cluster-wide.

use std::sync::Arc;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::constants::{resource_finalizer, metrics_finalizer, ERROR_REQUEUE_SECS, FAILURE_BACKOFF_SECS};
use crate::context::Context;
use crate::crd::{
    ClusterZone, Condition, ConditionStatus, DnsKind, SoaEditApi, SyncState, Zone, ZoneSpec, ZoneStatus,
    CONDITION_AVAILABLE,
};
use crate::metrics;
use crate::powerdns::client::canonicalize_domain;
use crate::powerdns::types::{CreateZone, PatchZoneAttributes, RRSet, Record, ZoneKind};
use crate::reconcilers::finalizers::is_deleted;
use crate::reconcilers::retry::{is_retryable_kube_error, requeue_after};
use crate::reconcilers::status::create_condition;
use crate::reconcilers::{seconds_since, should_reconcile};
use crate::resolver::{self, ResolverError};

#[derive(Debug, Error)]
pub enum ZoneReconcileError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Capability set both `Zone` and `ClusterZone` implement, differing only in
/// how their `Api<Self>` and finalizer patches are scoped.
#[async_trait::async_trait]
pub trait ZoneLike:
    Resource<DynamicType = ()> + Clone + std::fmt::Debug + DeserializeOwned + Serialize + Send + Sync + 'static
{
    const KIND: &'static str;

    fn common(&self) -> &ZoneSpec;
    fn zone_status(&self) -> Option<&ZoneStatus>;
    fn api(&self, client: &Client) -> Api<Self>
    where
        Self: Sized;
    async fn do_ensure_finalizer(&self, client: &Client, finalizer: &str) -> Result<(), kube::Error>;
    async fn do_remove_finalizer(&self, client: &Client, finalizer: &str) -> Result<(), kube::Error>;
}

#[async_trait::async_trait]
impl ZoneLike for Zone {
    const KIND: &'static str = "Zone";

    fn common(&self) -> &ZoneSpec {
        &self.spec.common
    }
    fn zone_status(&self) -> Option<&ZoneStatus> {
        self.status.as_ref()
    }
    fn api(&self, client: &Client) -> Api<Self> {
        Api::namespaced(client.clone(), &self.namespace().unwrap_or_default())
    }
    async fn do_ensure_finalizer(&self, client: &Client, finalizer: &str) -> Result<(), kube::Error> {
        crate::reconcilers::finalizers::ensure_finalizer(client, self, finalizer).await
    }
    async fn do_remove_finalizer(&self, client: &Client, finalizer: &str) -> Result<(), kube::Error> {
        crate::reconcilers::finalizers::remove_finalizer(client, self, finalizer).await
    }
}

#[async_trait::async_trait]
impl ZoneLike for ClusterZone {
    const KIND: &'static str = "ClusterZone";

    fn common(&self) -> &ZoneSpec {
        &self.spec.common
    }
    fn zone_status(&self) -> Option<&ZoneStatus> {
        self.status.as_ref()
    }
    fn api(&self, client: &Client) -> Api<Self> {
        Api::all(client.clone())
    }
    async fn do_ensure_finalizer(&self, client: &Client, finalizer: &str) -> Result<(), kube::Error> {
        crate::reconcilers::finalizers::ensure_cluster_finalizer(client, self, finalizer).await
    }
    async fn do_remove_finalizer(&self, client: &Client, finalizer: &str) -> Result<(), kube::Error> {
        crate::reconcilers::finalizers::remove_cluster_finalizer(client, self, finalizer).await
    }
}

pub async fn reconcile_zone_generic<T: ZoneLike>(zone: Arc<T>, ctx: Arc<Context>) -> Result<Action, ZoneReconcileError> {
    let name = zone.name_any();
    let namespace = zone.namespace().unwrap_or_default();
    let finalizer = resource_finalizer("zone");
    let metrics_fin = metrics_finalizer("zone");
    let api = zone.api(&ctx.client);

    if is_deleted(zone.meta()) {
        return handle_deletion(&zone, &ctx, &api, &finalizer, &metrics_fin).await;
    }
    zone.do_ensure_finalizer(&ctx.client, &finalizer).await?;
    zone.do_ensure_finalizer(&ctx.client, &metrics_fin).await?;

    let current_generation = zone.meta().generation;
    let observed_generation = zone.zone_status().and_then(|s| s.observed_generation);
    let is_modified = should_reconcile(current_generation, observed_generation);

    let previous_status = zone.zone_status().cloned().unwrap_or_default();
    let previous_condition = previous_status.conditions.iter().find(|c| c.type_ == CONDITION_AVAILABLE).cloned();

    // Failure back-off: a Failed, unmodified resource is not retried against
    // the backend more often than every FAILURE_BACKOFF_SECS.
    if previous_status.sync_status == SyncState::Failed
        && !is_modified
        && seconds_since(previous_status.conditions.last().and_then(|c| c.last_transition_time.as_ref()))
            < FAILURE_BACKOFF_SECS
    {
        metrics::set_zone_status(&name, &namespace, SyncState::Failed);
        return Ok(requeue_after(ERROR_REQUEUE_SECS));
    }

    let fqdn = match canonicalize_domain(&name) {
        Ok(f) => f,
        Err(e) => {
            return Ok(finish(
                &api,
                &zone,
                &name,
                &namespace,
                previous_status,
                SyncState::Failed,
                "InvalidName",
                &e.to_string(),
                previous_condition.as_ref(),
            )
            .await?)
        }
    };

    // Uniqueness check (§4.2 step 4 / §4.4).
    let entries = ctx.stores.zone_index_entries(&fqdn);
    let self_uid = zone.meta().uid.clone();
    let conflicting = entries
        .iter()
        .filter(|e| e.uid != self_uid && e.succeeded)
        .count();
    if conflicting > 0 {
        warn!(%name, %fqdn, "duplicate zone name detected");
        return Ok(finish(
            &api,
            &zone,
            &name,
            &namespace,
            previous_status,
            SyncState::Failed,
            "Duplicated",
            &format!("{conflicting} other zone(s) already claim {fqdn}"),
            previous_condition.as_ref(),
        )
        .await?);
    }

    // §4.5/§9: prefer spec.providerRef, falling back to the legacy
    // process-wide client only if no reference is set at all.
    let backend = match &zone.common().provider_ref {
        Some(p) => resolver::resolve_provider_client(&ctx.client, p).await,
        None => resolver::resolve_legacy_client().await,
    };
    let backend = match backend {
        Ok(b) => b,
        Err(e) => {
            let reason = if zone.common().provider_ref.is_some() { resolver_error_reason(&e) } else { "ProviderNotSet" };
            return Ok(finish(
                &api,
                &zone,
                &name,
                &namespace,
                previous_status,
                SyncState::Failed,
                reason,
                &e.to_string(),
                previous_condition.as_ref(),
            )
            .await?)
        }
    };

    let backend_zone = match backend.client.get_zone(&fqdn).await {
        Ok(z) => z,
        Err(e) => {
            return Ok(finish(
                &api,
                &zone,
                &name,
                &namespace,
                previous_status,
                SyncState::Failed,
                "SynchronizationFailed",
                &e.to_string(),
                previous_condition.as_ref(),
            )
            .await?)
        }
    };

    let common = zone.common();
    let nameservers: Vec<String> = common
        .nameservers
        .iter()
        .filter_map(|n| canonicalize_domain(n).ok())
        .collect();
    let catalog = common.catalog.as_ref().and_then(|c| canonicalize_domain(c).ok());
    let wire_kind = to_wire_kind(common.kind);
    let soa_edit_api = to_wire_soa_edit_api(common.soa_edit_api);

    let mut failure: Option<(&'static str, String)> = None;

    let backend_zone = match backend_zone {
        None => match backend
            .client
            .create_zone(&CreateZone {
                name: fqdn.clone(),
                kind: wire_kind,
                nameservers: nameservers.clone(),
                dnssec: false,
                soa_edit_api: soa_edit_api.clone(),
                catalog: catalog.clone(),
            })
            .await
        {
            Ok(z) => z,
            Err(e) => {
                return Ok(finish(
                    &api,
                    &zone,
                    &name,
                    &namespace,
                    previous_status,
                    SyncState::Failed,
                    "SynchronizationFailed",
                    &e.to_string(),
                    previous_condition.as_ref(),
                )
                .await?)
            }
        },
        Some(existing) => {
            let ns_identical = match backend.client.get_rrset(&fqdn, &fqdn, "NS").await {
                Ok(Some(rrset)) => {
                    let mut have: Vec<String> = rrset.records.iter().map(|r| r.content.clone()).collect();
                    let mut want = nameservers.clone();
                    have.sort();
                    want.sort();
                    have == want
                }
                Ok(None) => nameservers.is_empty(),
                Err(e) => {
                    failure = Some(("NSSynchronizationFailed", e.to_string()));
                    true
                }
            };
            if !ns_identical && failure.is_none() {
                let ttl = backend
                    .client
                    .get_rrset(&fqdn, &fqdn, "NS")
                    .await
                    .ok()
                    .flatten()
                    .and_then(|r| r.ttl)
                    .unwrap_or(crate::constants::DEFAULT_NS_TTL_SECS);
                let rrset = RRSet {
                    name: fqdn.clone(),
                    type_field: "NS".to_string(),
                    ttl: Some(ttl),
                    changetype: None,
                    records: nameservers.iter().map(|n| Record { content: n.clone(), disabled: Some(false) }).collect(),
                    comments: None,
                };
                if let Err(e) = backend.client.upsert_rrset(&fqdn, rrset).await {
                    failure = Some(("NSSynchronizationFailed", e.to_string()));
                }
            }

            let zone_identical = existing.kind == Some(wire_kind)
                && existing.soa_edit_api.as_deref() == Some(soa_edit_api.as_str())
                && existing.catalog == catalog;
            if !zone_identical && failure.is_none() {
                let patch = PatchZoneAttributes {
                    kind: Some(wire_kind),
                    soa_edit_api: Some(soa_edit_api.clone()),
                    catalog: catalog.clone(),
                };
                if let Err(e) = backend.client.patch_zone_attributes(&fqdn, &patch).await {
                    failure = Some(("SynchronizationFailed", e.to_string()));
                }
            }

            backend.client.get_zone(&fqdn).await.ok().flatten().unwrap_or(existing)
        }
    };

    let (sync_state, reason, message) = match &failure {
        Some((reason, message)) => (SyncState::Failed, *reason, message.clone()),
        None => (SyncState::Succeeded, "Synced", "zone matches backend".to_string()),
    };

    let now = Time(Utc::now());
    let condition = create_condition(
        CONDITION_AVAILABLE,
        if sync_state == SyncState::Succeeded { ConditionStatus::True } else { ConditionStatus::False },
        reason,
        &message,
        current_generation,
        previous_condition.as_ref(),
        now,
    );

    let new_status = ZoneStatus {
        id: backend_zone.id.clone(),
        name: backend_zone.name.clone(),
        kind: Some(common.kind),
        serial: backend_zone.serial,
        notified_serial: backend_zone.notified_serial,
        edited_serial: backend_zone.edited_serial,
        dnssec: backend_zone.dnssec.unwrap_or(false),
        masters: backend_zone.masters.clone().unwrap_or_default(),
        catalog: backend_zone.catalog.clone(),
        sync_status: sync_state,
        conditions: vec![condition],
        observed_generation: current_generation,
    };

    patch_status(&api, &name, &new_status).await?;
    metrics::set_zone_status(&name, &namespace, sync_state);
    metrics::record_reconcile_success(T::KIND);

    Ok(Action::requeue(std::time::Duration::from_secs(
        crate::constants::DEFAULT_RECONCILE_INTERVAL_SECS,
    )))
}

fn resolver_error_reason(err: &ResolverError) -> &'static str {
    match err {
        ResolverError::ProviderNotFound(_) | ResolverError::ProviderFetchFailed(..) => "ProviderNotAvailable",
        ResolverError::SecretKeyMissing { .. } | ResolverError::SecretFetchFailed { .. } => "SecretNotFound",
        ResolverError::CaBundleKeyMissing { .. } | ResolverError::CaBundleFetchFailed { .. } => "CABundleInvalid",
        ResolverError::InvalidProxyUrl(..) => "InvalidProxyUrl",
        _ => "ConfigurationError",
    }
}

#[allow(clippy::too_many_arguments)]
async fn finish<T: ZoneLike>(
    api: &Api<T>,
    zone: &T,
    name: &str,
    namespace: &str,
    previous: ZoneStatus,
    sync_state: SyncState,
    reason: &str,
    message: &str,
    previous_condition: Option<&Condition>,
) -> Result<Action, ZoneReconcileError> {
    let now = Time(Utc::now());
    let condition = create_condition(
        CONDITION_AVAILABLE,
        ConditionStatus::False,
        reason,
        message,
        zone.meta().generation,
        previous_condition,
        now,
    );
    let new_status = ZoneStatus {
        sync_status: sync_state,
        conditions: vec![condition],
        observed_generation: zone.meta().generation,
        ..previous
    };
    patch_status(api, name, &new_status).await?;
    metrics::set_zone_status(name, namespace, sync_state);
    metrics::record_reconcile_error(T::KIND);
    Ok(requeue_after(ERROR_REQUEUE_SECS))
}

async fn patch_status<T>(api: &Api<T>, name: &str, status: &ZoneStatus) -> Result<(), kube::Error>
where
    T: Resource<DynamicType = ()> + Clone + std::fmt::Debug + DeserializeOwned + Serialize,
{
    let patch = serde_json::json!({ "status": status });
    let params = PatchParams::apply("pdns-operator-zone").force();
    match api.patch_status(name, &params, &Patch::Merge(patch)).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
        Err(e) => Err(e),
    }
}

async fn handle_deletion<T: ZoneLike>(
    zone: &Arc<T>,
    ctx: &Context,
    api: &Api<T>,
    finalizer: &str,
    metrics_fin: &str,
) -> Result<Action, ZoneReconcileError> {
    let name = zone.name_any();
    let namespace = zone.namespace().unwrap_or_default();

    if zone.meta().finalizers.as_ref().map(|f| f.iter().any(|f| f == finalizer)).unwrap_or(false) {
        if let Some(provider_ref) = &zone.common().provider_ref {
            if let Ok(fqdn) = canonicalize_domain(&name) {
                if let Ok(backend) = resolver::resolve_provider_client(&ctx.client, provider_ref).await {
                    match backend.client.delete_zone(&fqdn).await {
                        Ok(()) => {}
                        Err(e) if e.is_not_found() => {}
                        Err(e) => {
                            warn!(%name, error = %e, "zone deletion failed, will retry");
                            return Ok(requeue_after(ERROR_REQUEUE_SECS));
                        }
                    }
                }
            }
        }
        zone.do_remove_finalizer(&ctx.client, finalizer).await?;
    }
    if zone.meta().finalizers.as_ref().map(|f| f.iter().any(|f| f == metrics_fin)).unwrap_or(false) {
        zone.do_remove_finalizer(&ctx.client, metrics_fin).await?;
        metrics::remove_zone_status(&name, &namespace);
    }
    let _ = api;
    info!(%name, "zone deleted and finalizers removed");
    Ok(Action::await_change())
}

pub(crate) fn to_wire_kind(kind: DnsKind) -> ZoneKind {
    match kind {
        DnsKind::Native => ZoneKind::Native,
        DnsKind::Master => ZoneKind::Master,
        DnsKind::Slave => ZoneKind::Slave,
        DnsKind::Producer => ZoneKind::Producer,
        DnsKind::Consumer => ZoneKind::Consumer,
    }
}

pub(crate) fn to_wire_soa_edit_api(v: SoaEditApi) -> String {
    match v {
        SoaEditApi::Default => "DEFAULT".to_string(),
        SoaEditApi::Increase => "INCREASE".to_string(),
        SoaEditApi::Epoch => "EPOCH".to_string(),
    }
}

pub async fn reconcile_zone(zone: Arc<Zone>, ctx: Arc<Context>) -> Result<Action, ZoneReconcileError> {
    reconcile_zone_generic(zone, ctx).await
}

pub async fn reconcile_cluster_zone(zone: Arc<ClusterZone>, ctx: Arc<Context>) -> Result<Action, ZoneReconcileError> {
    reconcile_zone_generic(zone, ctx).await
}

pub fn error_policy<T>(_obj: Arc<T>, err: &ZoneReconcileError, _ctx: Arc<Context>) -> Action {
    // §7: a 409/5xx conflict is expected and self-heals; anything else is
    // worth a log line since it may need operator attention.
    let ZoneReconcileError::Kube(kube_err) = err;
    if !is_retryable_kube_error(kube_err) {
        warn!(error = %kube_err, "zone reconcile hit a non-retryable kube error");
    }
    requeue_after(ERROR_REQUEUE_SECS)
}

