//! Provider reconciler (§4.1): validates credentials and backend
//! reachability, and reports health via `status.connectionState`.

use std::sync::Arc;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::constants::{resource_finalizer, CONNECTION_TIME_REFRESH_SECS, ERROR_REQUEUE_SECS, KIND_PROVIDER};
use crate::context::Context;
use crate::crd::{Condition, ConditionStatus, ConnectionState, Provider, ProviderStatus, CONDITION_AVAILABLE};
use crate::metrics;
use crate::reconcilers::finalizers::{ensure_cluster_finalizer, is_deleted, remove_cluster_finalizer};
use crate::reconcilers::retry::{is_retryable_kube_error, requeue_after};
use crate::reconcilers::status::create_condition;
use crate::resolver::{self, ResolverError};

#[derive(Debug, Error)]
pub enum ProviderReconcileError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

fn patch_params() -> PatchParams {
    PatchParams::apply("pdns-operator-provider").force()
}

pub async fn reconcile_provider(provider: Arc<Provider>, ctx: Arc<Context>) -> Result<Action, ProviderReconcileError> {
    let api: Api<Provider> = Api::all(ctx.client.clone());
    let finalizer = resource_finalizer("provider");

    if is_deleted(&provider.metadata) {
        remove_cluster_finalizer(&ctx.client, provider.as_ref(), &finalizer).await?;
        info!(name = %provider.name_any(), "provider finalizer removed");
        return Ok(Action::await_change());
    }
    ensure_cluster_finalizer(&ctx.client, provider.as_ref(), &finalizer).await?;

    let now = Time(Utc::now());
    let previous_status = provider.status.clone().unwrap_or_default();
    let previous_condition = previous_status
        .conditions
        .iter()
        .find(|c| c.type_ == CONDITION_AVAILABLE)
        .cloned();

    let new_status = match resolver::build_backend_from_provider(&ctx.client, &provider).await {
        Ok(backend) => match backend.client.describe_server().await {
            Ok(server) if server.daemon_type == "authoritative" => {
                info!(name = %provider.name_any(), "provider connected");
                build_connected_status(&previous_status, &server, previous_condition.as_ref(), &provider, now.clone())
            }
            Ok(server) => build_failed_status(
                &previous_status,
                &format!("backend daemon_type is {:?}, expected authoritative", server.daemon_type),
                "UnexpectedDaemonType",
                previous_condition.as_ref(),
                &provider,
                now.clone(),
            ),
            Err(e) => build_failed_status(
                &previous_status,
                &format!("server describe failed: {e}"),
                "SynchronizationFailed",
                previous_condition.as_ref(),
                &provider,
                now.clone(),
            ),
        },
        Err(ResolverError::SecretKeyMissing { .. }) => build_failed_status(
            &previous_status,
            "credentials secret missing or key empty",
            "SecretNotFound",
            previous_condition.as_ref(),
            &provider,
            now.clone(),
        ),
        Err(e) => build_failed_status(
            &previous_status,
            &format!("failed to build backend client: {e}"),
            "ConfigurationError",
            previous_condition.as_ref(),
            &provider,
            now.clone(),
        ),
    };

    let healthy = new_status.is_healthy();
    let patch = serde_json::json!({ "status": new_status });
    if let Err(e) = api
        .patch_status(&provider.name_any(), &patch_params(), &Patch::Merge(patch))
        .await
    {
        warn!(name = %provider.name_any(), error = %e, "status patch failed, requeueing");
        return Ok(requeue_after(ERROR_REQUEUE_SECS));
    }

    metrics::record_reconcile_success(KIND_PROVIDER);

    if healthy {
        Ok(requeue_after(u64::from(provider.spec.reconcile_interval_seconds.max(1))))
    } else {
        Ok(requeue_after(ERROR_REQUEUE_SECS))
    }
}

fn build_connected_status(
    previous: &ProviderStatus,
    server: &crate::powerdns::types::Server,
    previous_condition: Option<&Condition>,
    provider: &Provider,
    now: Time,
) -> ProviderStatus {
    let condition = create_condition(
        CONDITION_AVAILABLE,
        ConditionStatus::True,
        "Connected",
        "provider is reachable and reports an authoritative daemon",
        provider.meta().generation,
        previous_condition,
        now.clone(),
    );
    let last_connection_time = should_refresh_connection_time(previous, ConnectionState::Connected, &now)
        .then_some(now)
        .or_else(|| previous.last_connection_time.clone());
    ProviderStatus {
        connection_state: ConnectionState::Connected,
        server_version: Some(server.version.clone()),
        daemon_type: Some(server.daemon_type.clone()),
        server_id: Some(server.id.clone()),
        last_connection_time,
        conditions: vec![condition],
        observed_generation: provider.meta().generation,
    }
}

fn build_failed_status(
    previous: &ProviderStatus,
    message: &str,
    reason: &str,
    previous_condition: Option<&Condition>,
    provider: &Provider,
    now: Time,
) -> ProviderStatus {
    let condition = create_condition(
        CONDITION_AVAILABLE,
        ConditionStatus::False,
        reason,
        message,
        provider.meta().generation,
        previous_condition,
        now.clone(),
    );
    let last_connection_time = should_refresh_connection_time(previous, ConnectionState::Failed, &now)
        .then_some(now)
        .or_else(|| previous.last_connection_time.clone());
    ProviderStatus {
        connection_state: ConnectionState::Failed,
        server_version: previous.server_version.clone(),
        daemon_type: previous.daemon_type.clone(),
        server_id: previous.server_id.clone(),
        last_connection_time,
        conditions: vec![condition],
        observed_generation: provider.meta().generation,
    }
}

/// `last_connection_time` is refreshed only on a state transition or after
/// `CONNECTION_TIME_REFRESH_SECS` have elapsed, bounding status-write
/// amplification (§4.1).
fn should_refresh_connection_time(previous: &ProviderStatus, next_state: ConnectionState, now: &Time) -> bool {
    if previous.connection_state != next_state {
        return true;
    }
    match &previous.last_connection_time {
        None => true,
        Some(t) => (now.0 - t.0).num_seconds() > CONNECTION_TIME_REFRESH_SECS,
    }
}

pub fn error_policy(_provider: Arc<Provider>, err: &ProviderReconcileError, _ctx: Arc<Context>) -> Action {
    let ProviderReconcileError::Kube(kube_err) = err;
    if !is_retryable_kube_error(kube_err) {
        warn!(error = %kube_err, "provider reconcile hit a non-retryable kube error");
    }
    requeue_after(ERROR_REQUEUE_SECS)
}
