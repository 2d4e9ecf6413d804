//! Reconciliation logic for every resource kind this operator manages.
//!
//! Each reconciler watches one CRD kind, converges it against the PowerDNS
//! backend, and writes status back. Zone/`ClusterZone` and RRset/
//! `ClusterRRset` share one generic reconcile function each, parameterized
//! over a small capability trait (§9 design note).

pub mod finalizers;
pub mod provider;
pub mod retry;
pub mod rrset;
pub mod status;
pub mod zone;

#[cfg(test)]
mod rrset_tests;
#[cfg(test)]
mod status_tests;
#[cfg(test)]
mod zone_tests;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

/// Check if a resource's spec has changed by comparing generation with
/// `observed_generation`. `metadata.generation` is incremented by the API
/// server only when the spec changes; `status.observedGeneration` is set by
/// the controller after processing a spec.
#[must_use]
pub fn should_reconcile(current_generation: Option<i64>, observed_generation: Option<i64>) -> bool {
    match (current_generation, observed_generation) {
        (Some(current), Some(observed)) => current != observed,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Returns `true` if `new_value` differs from `current_value`, used to
/// avoid status-only patches that would re-trigger a reconcile via watch.
#[must_use]
pub fn status_changed<T: PartialEq>(current_value: &Option<T>, new_value: &Option<T>) -> bool {
    current_value != new_value
}

/// Seconds elapsed since `time`, or `i64::MAX` if `time` is absent (treated
/// as "infinitely long ago", i.e. never recently transitioned).
pub fn seconds_since(time: Option<&Time>) -> i64 {
    match time {
        Some(t) => (Utc::now() - t.0).num_seconds().max(0),
        None => i64::MAX,
    }
}

#[cfg(test)]
mod mod_tests;
