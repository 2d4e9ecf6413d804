//! RRset / `ClusterRRset` reconciler (§4.3), implemented once against the
//! [`RRsetLike`] capability trait and instantiated for both concrete kinds.

use std::sync::Arc;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{OwnerReference, Time};
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::constants::{
    resource_finalizer, metrics_finalizer, API_GROUP, API_VERSION, COMMENT_ACCOUNT, ERROR_REQUEUE_SECS,
    FAILURE_BACKOFF_SECS,
};
use crate::context::Context;
use crate::crd::{
    ClusterRRset, ClusterZone, Condition, ConditionStatus, ParentKind, ParentRef, RRset, RRsetSpec, RRsetStatus,
    SyncState, Zone, CONDITION_AVAILABLE,
};
use crate::metrics;
use crate::powerdns::client::canonicalize_domain;
use crate::powerdns::types::{Comment, RRSet, Record};
use crate::reconcilers::finalizers::is_deleted;
use crate::reconcilers::retry::{is_retryable_kube_error, requeue_after, requeue_parent_missing};
use crate::reconcilers::status::create_condition;
use crate::reconcilers::{seconds_since, should_reconcile};
use crate::resolver;

#[derive(Debug, Error)]
pub enum RRsetReconcileError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Capability set both `RRset` and `ClusterRRset` implement.
#[async_trait::async_trait]
pub trait RRsetLike:
    Resource<DynamicType = ()> + Clone + std::fmt::Debug + DeserializeOwned + Serialize + Send + Sync + 'static
{
    const KIND: &'static str;
    const IS_NAMESPACED: bool;

    fn common(&self) -> &RRsetSpec;
    fn rrset_status(&self) -> Option<&RRsetStatus>;
    fn api(&self, client: &Client) -> Api<Self>
    where
        Self: Sized;
    async fn do_ensure_finalizer(&self, client: &Client, finalizer: &str) -> Result<(), kube::Error>;
    async fn do_remove_finalizer(&self, client: &Client, finalizer: &str) -> Result<(), kube::Error>;
}

#[async_trait::async_trait]
impl RRsetLike for RRset {
    const KIND: &'static str = "RRset";
    const IS_NAMESPACED: bool = true;

    fn common(&self) -> &RRsetSpec {
        &self.spec.common
    }
    fn rrset_status(&self) -> Option<&RRsetStatus> {
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
impl RRsetLike for ClusterRRset {
    const KIND: &'static str = "ClusterRRset";
    const IS_NAMESPACED: bool = false;

    fn common(&self) -> &RRsetSpec {
        &self.spec.common
    }
    fn rrset_status(&self) -> Option<&RRsetStatus> {
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

/// A resolved parent zone: its canonical FQDN, whether it has already
/// converged, and the provider it's bound to.
struct ParentInfo {
    fqdn: String,
    uid: Option<String>,
    succeeded: bool,
    provider_ref: Option<crate::crd::ProviderRef>,
}

async fn resolve_parent(
    client: &Client,
    parent_ref: &ParentRef,
    self_namespace: &str,
) -> Result<Option<ParentInfo>, kube::Error> {
    match parent_ref.kind {
        ParentKind::Zone => {
            let ns = parent_ref.namespace.clone().unwrap_or_else(|| self_namespace.to_string());
            let api: Api<Zone> = Api::namespaced(client.clone(), &ns);
            match api.get(&parent_ref.name).await {
                Ok(zone) => {
                    let Ok(fqdn) = canonicalize_domain(&zone.name_any()) else { return Ok(None) };
                    Ok(Some(ParentInfo {
                        fqdn,
                        uid: zone.meta().uid.clone(),
                        succeeded: zone.status.as_ref().map(|s| s.sync_status) == Some(SyncState::Succeeded),
                        provider_ref: zone.spec.common.provider_ref.clone(),
                    }))
                }
                Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
                Err(e) => Err(e),
            }
        }
        ParentKind::ClusterZone => {
            let api: Api<ClusterZone> = Api::all(client.clone());
            match api.get(&parent_ref.name).await {
                Ok(zone) => {
                    let Ok(fqdn) = canonicalize_domain(&zone.name_any()) else { return Ok(None) };
                    Ok(Some(ParentInfo {
                        fqdn,
                        uid: zone.meta().uid.clone(),
                        succeeded: zone.status.as_ref().map(|s| s.sync_status) == Some(SyncState::Succeeded),
                        provider_ref: zone.spec.common.provider_ref.clone(),
                    }))
                }
                Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
                Err(e) => Err(e),
            }
        }
    }
}

/// Combines a (possibly relative) rrset name with the parent zone's FQDN.
/// An empty name (or "@") means the zone apex itself.
pub(crate) fn compute_dns_entry_name(rrset_name: &str, zone_fqdn: &str) -> String {
    let trimmed = rrset_name.trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "@" {
        zone_fqdn.to_string()
    } else {
        format!("{}.{}", trimmed.to_ascii_lowercase(), zone_fqdn)
    }
}

pub async fn reconcile_rrset_generic<T: RRsetLike>(rrset: Arc<T>, ctx: Arc<Context>) -> Result<Action, RRsetReconcileError> {
    let name = rrset.name_any();
    let namespace = rrset.namespace().unwrap_or_default();
    let finalizer = resource_finalizer("rrset");
    let metrics_fin = metrics_finalizer("rrset");
    let api = rrset.api(&ctx.client);

    if is_deleted(rrset.meta()) {
        return handle_deletion(&rrset, &ctx, &api, &finalizer, &metrics_fin).await;
    }

    // Finalizers are added eagerly, before parent resolution, so that a
    // child created against a not-yet-ready parent is still tracked for
    // best-effort backend cleanup on delete (§4.3 step 1).
    rrset.do_ensure_finalizer(&ctx.client, &finalizer).await?;
    rrset.do_ensure_finalizer(&ctx.client, &metrics_fin).await?;

    let current_generation = rrset.meta().generation;
    let observed_generation = rrset.rrset_status().and_then(|s| s.observed_generation);
    let is_modified = should_reconcile(current_generation, observed_generation);

    let previous_status = rrset.rrset_status().cloned().unwrap_or_default();
    let previous_condition = previous_status.conditions.iter().find(|c| c.type_ == CONDITION_AVAILABLE).cloned();

    // Failure back-off: a Failed, unmodified resource is not retried against
    // the backend more often than every FAILURE_BACKOFF_SECS.
    if previous_status.sync_status == SyncState::Failed
        && !is_modified
        && seconds_since(previous_status.conditions.last().and_then(|c| c.last_transition_time.as_ref()))
            < FAILURE_BACKOFF_SECS
    {
        let entry = previous_status.dns_entry_name.clone().unwrap_or_else(|| name.clone());
        metrics::set_rrset_status(&entry, &rrset.common().record_type.to_ascii_uppercase(), &name, &namespace, SyncState::Failed);
        return Ok(requeue_after(ERROR_REQUEUE_SECS));
    }

    let parent_ref = rrset.common().parent_ref.clone();
    let parent = match resolve_parent(&ctx.client, &parent_ref, &namespace).await {
        Ok(p) => p,
        Err(e) => return Err(e.into()),
    };

    let parent = match parent {
        None => {
            // Nothing to clean up backend-side; closes the common
            // create-zone-and-rrset-together race with a short requeue
            // instead of a hard failure.
            rrset.do_remove_finalizer(&ctx.client, &finalizer).await?;
            return Ok(finish(
                &api,
                &rrset,
                &name,
                &namespace,
                previous_status,
                SyncState::Pending,
                "ZoneNotAvailable",
                &format!("parent {:?} {} not found", parent_ref.kind, parent_ref.name),
                previous_condition.as_ref(),
                true,
            )
            .await?)
        }
        Some(p) => p,
    };

    if !parent.succeeded {
        // The back-off gate above already short-circuited if this resource
        // was recently marked Failed and unmodified, so here we record the
        // parent's unreadiness but keep going: the parent's status may be
        // stale relative to backend reality.
        let now = Time(Utc::now());
        let condition = create_condition(
            CONDITION_AVAILABLE,
            ConditionStatus::False,
            "ZoneNotAvailable",
            &format!("parent {} has not converged yet", parent_ref.name),
            current_generation,
            previous_condition.as_ref(),
            now,
        );
        let transitional_status = RRsetStatus {
            sync_status: SyncState::Failed,
            conditions: vec![condition],
            observed_generation: current_generation,
            ..previous_status.clone()
        };
        patch_status(&api, &name, &transitional_status).await?;
        metrics::set_rrset_status(
            transitional_status.dns_entry_name.as_deref().unwrap_or(&name),
            &rrset.common().record_type.to_ascii_uppercase(),
            &name,
            &namespace,
            SyncState::Failed,
        );
    }

    let entry_name = compute_dns_entry_name(&rrset.common().name, &parent.fqdn);
    let record_type = rrset.common().record_type.to_ascii_uppercase();

    // Uniqueness check (§4.3 step 4 / §4.4).
    let entries = ctx.stores.rrset_index_entries(&entry_name, &record_type);
    let self_uid = rrset.meta().uid.clone();
    let conflicting = entries.iter().filter(|e| e.uid != self_uid && e.succeeded).count();
    if conflicting > 0 {
        warn!(%name, %entry_name, %record_type, "duplicate rrset detected");
        return Ok(finish(
            &api,
            &rrset,
            &name,
            &namespace,
            previous_status,
            SyncState::Failed,
            "Duplicated",
            &format!("{conflicting} other rrset(s) already claim {entry_name} {record_type}"),
            previous_condition.as_ref(),
            false,
        )
        .await?);
    }

    // §4.5/§9: prefer the parent's providerRef, falling back to the legacy
    // process-wide client only if no reference is set at all.
    let backend = match parent.provider_ref.clone() {
        Some(provider_ref) => resolver::resolve_provider_client(&ctx.client, &provider_ref).await,
        None => resolver::resolve_legacy_client().await,
    };
    let backend = match backend {
        Ok(b) => b,
        Err(e) => {
            let reason = if parent.provider_ref.is_some() { "ConfigurationError" } else { "ProviderNotSet" };
            return Ok(finish(
                &api,
                &rrset,
                &name,
                &namespace,
                previous_status,
                SyncState::Failed,
                reason,
                &e.to_string(),
                previous_condition.as_ref(),
                false,
            )
            .await?)
        }
    };

    let common = rrset.common();
    let mut want_records: Vec<String> = common.records.clone();
    want_records.sort();

    let comments = common.comment.as_ref().map(|c| {
        vec![Comment { content: c.clone(), account: Some(COMMENT_ACCOUNT.to_string()), modified_at: None }]
    });
    let want_comments: Vec<(String, Option<String>)> = comments
        .as_ref()
        .map(|cs| cs.iter().map(|c| (c.content.clone(), c.account.clone())).collect())
        .unwrap_or_default();

    let existing = backend.client.get_rrset(&parent.fqdn, &entry_name, &record_type).await;
    let (changed, failure) = match existing {
        Ok(current) => {
            let identical = current.as_ref().is_some_and(|c| {
                let mut have: Vec<String> = c.records.iter().map(|r| r.content.clone()).collect();
                have.sort();
                let have_comments: Vec<(String, Option<String>)> = c
                    .comments
                    .as_ref()
                    .map(|cs| cs.iter().map(|cm| (cm.content.clone(), cm.account.clone())).collect())
                    .unwrap_or_default();
                have == want_records && c.ttl == Some(common.ttl) && have_comments == want_comments
            });
            if identical {
                (false, None)
            } else {
                let desired = RRSet {
                    name: entry_name.clone(),
                    type_field: record_type.clone(),
                    ttl: Some(common.ttl),
                    changetype: None,
                    records: want_records
                        .iter()
                        .map(|r| Record { content: r.clone(), disabled: Some(false) })
                        .collect(),
                    comments,
                };
                match backend.client.upsert_rrset(&parent.fqdn, desired).await {
                    Ok(()) => (true, None),
                    Err(e) => (false, Some(("SynchronizationFailed", e.to_string()))),
                }
            }
        }
        Err(e) => (false, Some(("SynchronizationFailed", e.to_string()))),
    };

    if T::IS_NAMESPACED || matches!(parent_ref.kind, ParentKind::ClusterZone) {
        set_owner_reference(&api, &name, &parent_ref, &parent).await;
    } else {
        warn!(%name, "skipping owner reference: cluster-scoped child cannot own a namespaced parent");
    }

    let (sync_state, reason, message) = match &failure {
        Some((reason, message)) => (SyncState::Failed, *reason, message.clone()),
        None => (SyncState::Succeeded, "Synced", "rrset matches backend".to_string()),
    };

    let now = Time(Utc::now());
    let condition = create_condition(
        CONDITION_AVAILABLE,
        if sync_state == SyncState::Succeeded { ConditionStatus::True } else { ConditionStatus::False },
        reason,
        &message,
        current_generation,
        previous_condition.as_ref(),
        now.clone(),
    );

    let last_update_time = if changed { Some(now) } else { previous_status.last_update_time.clone() };

    let new_status = RRsetStatus {
        dns_entry_name: Some(entry_name.clone()),
        sync_status: sync_state,
        last_update_time,
        conditions: vec![condition],
        observed_generation: current_generation,
    };

    patch_status(&api, &name, &new_status).await?;
    metrics::set_rrset_status(&entry_name, &record_type, &name, &namespace, sync_state);
    metrics::record_reconcile_success(T::KIND);

    Ok(requeue_after(crate::constants::DEFAULT_RECONCILE_INTERVAL_SECS))
}

async fn set_owner_reference<T>(api: &Api<T>, name: &str, parent_ref: &ParentRef, parent: &ParentInfo)
where
    T: Resource<DynamicType = ()> + Clone + std::fmt::Debug + DeserializeOwned + Serialize,
{
    let Some(uid) = parent.uid.clone() else { return };
    let owner = OwnerReference {
        api_version: format!("{API_GROUP}/{API_VERSION}"),
        kind: match parent_ref.kind {
            ParentKind::Zone => "Zone".to_string(),
            ParentKind::ClusterZone => "ClusterZone".to_string(),
        },
        name: parent_ref.name.clone(),
        uid,
        controller: Some(false),
        block_owner_deletion: Some(false),
    };
    let patch = serde_json::json!({ "metadata": { "ownerReferences": [owner] } });
    if let Err(e) = api
        .patch(name, &PatchParams::apply("pdns-operator-rrset").force(), &Patch::Merge(patch))
        .await
    {
        warn!(%name, error = %e, "failed to set owner reference, continuing without it");
    }
}

#[allow(clippy::too_many_arguments)]
async fn finish<T: RRsetLike>(
    api: &Api<T>,
    rrset: &T,
    name: &str,
    namespace: &str,
    previous: RRsetStatus,
    sync_state: SyncState,
    reason: &str,
    message: &str,
    previous_condition: Option<&Condition>,
    parent_missing: bool,
) -> Result<Action, RRsetReconcileError> {
    let now = Time(Utc::now());
    let condition = create_condition(
        CONDITION_AVAILABLE,
        ConditionStatus::False,
        reason,
        message,
        rrset.meta().generation,
        previous_condition,
        now,
    );
    let new_status = RRsetStatus {
        sync_status: sync_state,
        conditions: vec![condition],
        observed_generation: rrset.meta().generation,
        ..previous
    };
    patch_status(api, name, &new_status).await?;
    let entry = new_status.dns_entry_name.clone().unwrap_or_else(|| name.to_string());
    metrics::set_rrset_status(&entry, &rrset.common().record_type.to_ascii_uppercase(), name, namespace, sync_state);
    metrics::record_reconcile_error(T::KIND);
    Ok(if parent_missing { requeue_parent_missing() } else { requeue_after(ERROR_REQUEUE_SECS) })
}

async fn patch_status<T>(api: &Api<T>, name: &str, status: &RRsetStatus) -> Result<(), kube::Error>
where
    T: Resource<DynamicType = ()> + Clone + std::fmt::Debug + DeserializeOwned + Serialize,
{
    let patch = serde_json::json!({ "status": status });
    let params = PatchParams::apply("pdns-operator-rrset").force();
    match api.patch_status(name, &params, &Patch::Merge(patch)).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
        Err(e) => Err(e),
    }
}

/// On delete: best-effort DELETE of the matching backend rrset, then drop
/// finalizers unconditionally. If the parent zone object is already gone,
/// the FQDN is recomputed from `parent_ref.name` directly (it equals the
/// zone's own object name) rather than blocking finalizer removal on a
/// parent lookup that can no longer succeed.
async fn handle_deletion<T: RRsetLike>(
    rrset: &Arc<T>,
    ctx: &Context,
    api: &Api<T>,
    finalizer: &str,
    metrics_fin: &str,
) -> Result<Action, RRsetReconcileError> {
    let name = rrset.name_any();
    let namespace = rrset.namespace().unwrap_or_default();

    if rrset.meta().finalizers.as_ref().map(|f| f.iter().any(|f| f == finalizer)).unwrap_or(false) {
        let common = rrset.common();
        let parent_ref = &common.parent_ref;
        // Best effort: if the parent zone object is already gone, fall back
        // to treating `parent_ref.name` itself as the zone's FQDN (Zone
        // objects are named after the zone they represent) rather than
        // blocking finalizer removal on a lookup that can no longer succeed.
        let resolved_parent = resolve_parent(&ctx.client, parent_ref, &namespace).await.ok().flatten();
        let zone_fqdn = resolved_parent
            .as_ref()
            .map(|p| p.fqdn.clone())
            .or_else(|| canonicalize_domain(&parent_ref.name).ok());
        let provider_ref = resolved_parent.and_then(|p| p.provider_ref);

        if let (Some(zone_fqdn), Some(provider_ref)) = (zone_fqdn, provider_ref) {
            let entry_name = rrset
                .rrset_status()
                .and_then(|s| s.dns_entry_name.clone())
                .unwrap_or_else(|| compute_dns_entry_name(&common.name, &zone_fqdn));
            let record_type = common.record_type.to_ascii_uppercase();
            if let Ok(backend) = resolver::resolve_provider_client(&ctx.client, &provider_ref).await {
                match backend.client.get_rrset(&zone_fqdn, &entry_name, &record_type).await {
                    Ok(Some(_)) => {
                        let tombstone = RRSet {
                            name: entry_name.clone(),
                            type_field: record_type.clone(),
                            ttl: None,
                            changetype: Some(crate::powerdns::types::ChangeType::Delete),
                            records: Vec::new(),
                            comments: None,
                        };
                        if let Err(e) = backend.client.upsert_rrset(&zone_fqdn, tombstone).await {
                            warn!(%name, error = %e, "best-effort rrset deletion failed, dropping finalizer anyway");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(%name, error = %e, "rrset lookup during deletion failed, dropping finalizer anyway"),
                }
            }
        }
        rrset.do_remove_finalizer(&ctx.client, finalizer).await?;
    }
    if rrset.meta().finalizers.as_ref().map(|f| f.iter().any(|f| f == metrics_fin)).unwrap_or(false) {
        rrset.do_remove_finalizer(&ctx.client, metrics_fin).await?;
        let entry = rrset.rrset_status().and_then(|s| s.dns_entry_name.clone()).unwrap_or_else(|| name.clone());
        metrics::remove_rrset_status(&entry, &rrset.common().record_type.to_ascii_uppercase(), &name, &namespace);
    }
    let _ = api;
    info!(%name, "rrset deleted and finalizers removed");
    Ok(Action::await_change())
}

pub async fn reconcile_rrset(rrset: Arc<RRset>, ctx: Arc<Context>) -> Result<Action, RRsetReconcileError> {
    reconcile_rrset_generic(rrset, ctx).await
}

pub async fn reconcile_cluster_rrset(rrset: Arc<ClusterRRset>, ctx: Arc<Context>) -> Result<Action, RRsetReconcileError> {
    reconcile_rrset_generic(rrset, ctx).await
}

pub fn error_policy<T>(_obj: Arc<T>, err: &RRsetReconcileError, _ctx: Arc<Context>) -> Action {
    let RRsetReconcileError::Kube(kube_err) = err;
    if !is_retryable_kube_error(kube_err) {
        warn!(error = %kube_err, "rrset reconcile hit a non-retryable kube error");
    }
    requeue_after(ERROR_REQUEUE_SECS)
}

