//! Process-wide Prometheus metrics, registered once in a global registry and
//! exposed on the `/metrics` endpoint.
//!
//! `LazyLock`-initialized statics, each self-registering in its constructor
//! closure, plus small helper functions so reconcilers never touch the
//! `prometheus` API directly.

use std::sync::LazyLock;

use prometheus::{CounterVec, HistogramVec, Opts, Registry, TextEncoder};

use crate::crd::SyncState;

pub const METRICS_NAMESPACE: &str = "dns_cav_enablers_ob";

pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// `zones_status{name,namespace,status}` — set to 1 on the label
/// combination matching the object's current sync state; all other values
/// for the same (name, namespace) are removed on every write (§6).
pub static ZONES_STATUS: LazyLock<prometheus::GaugeVec> = LazyLock::new(|| {
    let gauge = prometheus::GaugeVec::new(
        Opts::new("zones_status", "Current sync status of a Zone/ClusterZone").namespace(METRICS_NAMESPACE),
        &["name", "namespace", "status"],
    )
    .expect("zones_status gauge is well-formed");
    METRICS_REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("zones_status registers exactly once");
    gauge
});

/// `rrsets_status{fqdn,type,status,name,namespace}`.
pub static RRSETS_STATUS: LazyLock<prometheus::GaugeVec> = LazyLock::new(|| {
    let gauge = prometheus::GaugeVec::new(
        Opts::new("rrsets_status", "Current sync status of an RRset/ClusterRRset").namespace(METRICS_NAMESPACE),
        &["fqdn", "type", "status", "name", "namespace"],
    )
    .expect("rrsets_status gauge is well-formed");
    METRICS_REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("rrsets_status registers exactly once");
    gauge
});

pub static RECONCILE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let counter = CounterVec::new(
        Opts::new("reconcile_total", "Reconciliations by kind and outcome").namespace(METRICS_NAMESPACE),
        &["kind", "outcome"],
    )
    .expect("reconcile_total counter is well-formed");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("reconcile_total registers exactly once");
    counter
});

pub static RECONCILE_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let histogram = HistogramVec::new(
        prometheus::HistogramOpts::new("reconcile_duration_seconds", "Reconcile duration by kind")
            .namespace(METRICS_NAMESPACE),
        &["kind"],
    )
    .expect("reconcile_duration_seconds histogram is well-formed");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("reconcile_duration_seconds registers exactly once");
    histogram
});

pub static LEADER_TRANSITIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let counter = CounterVec::new(
        Opts::new("leader_transitions_total", "Leader election transitions").namespace(METRICS_NAMESPACE),
        &["transition"],
    )
    .expect("leader_transitions_total counter is well-formed");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("leader_transitions_total registers exactly once");
    counter
});

fn sync_state_label(state: SyncState) -> &'static str {
    match state {
        SyncState::Succeeded => "Succeeded",
        SyncState::Failed => "Failed",
        SyncState::Pending => "Pending",
    }
}

const ALL_STATES: [SyncState; 3] = [SyncState::Succeeded, SyncState::Failed, SyncState::Pending];

/// Sets the zone gauge for `(name, namespace)` to the given state, removing
/// every other state value for the same (name, namespace) — the
/// partial-match deletion §6 requires.
pub fn set_zone_status(name: &str, namespace: &str, state: SyncState) {
    for candidate in ALL_STATES {
        let label = sync_state_label(candidate);
        if candidate == state {
            ZONES_STATUS.with_label_values(&[name, namespace, label]).set(1.0);
        } else {
            let _ = ZONES_STATUS.remove_label_values(&[name, namespace, label]);
        }
    }
}

pub fn remove_zone_status(name: &str, namespace: &str) {
    for candidate in ALL_STATES {
        let _ = ZONES_STATUS.remove_label_values(&[name, namespace, sync_state_label(candidate)]);
    }
}

pub fn set_rrset_status(fqdn: &str, record_type: &str, name: &str, namespace: &str, state: SyncState) {
    for candidate in ALL_STATES {
        let label = sync_state_label(candidate);
        if candidate == state {
            RRSETS_STATUS
                .with_label_values(&[fqdn, record_type, label, name, namespace])
                .set(1.0);
        } else {
            let _ = RRSETS_STATUS.remove_label_values(&[fqdn, record_type, label, name, namespace]);
        }
    }
}

pub fn remove_rrset_status(fqdn: &str, record_type: &str, name: &str, namespace: &str) {
    for candidate in ALL_STATES {
        let _ = RRSETS_STATUS.remove_label_values(&[fqdn, record_type, sync_state_label(candidate), name, namespace]);
    }
}

pub fn record_reconcile_success(kind: &str) {
    RECONCILE_TOTAL.with_label_values(&[kind, "success"]).inc();
}

pub fn record_reconcile_error(kind: &str) {
    RECONCILE_TOTAL.with_label_values(&[kind, "error"]).inc();
}

pub fn observe_reconcile_duration(kind: &str, seconds: f64) {
    RECONCILE_DURATION_SECONDS.with_label_values(&[kind]).observe(seconds);
}

pub fn record_leader_elected() {
    LEADER_TRANSITIONS_TOTAL.with_label_values(&["elected"]).inc();
}

pub fn record_leader_lost() {
    LEADER_TRANSITIONS_TOTAL.with_label_values(&["lost"]).inc();
}

/// Renders the registry in Prometheus text exposition format.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let metric_families = METRICS_REGISTRY.gather();
    let encoder = TextEncoder::new();
    encoder.encode_to_string(&metric_families)
}

