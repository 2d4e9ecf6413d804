use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use futures::StreamExt;
use kube::runtime::{reflector, watcher, Controller};
use kube::{Api, Client, ResourceExt};
use kube_lease_manager::LeaseManagerBuilder;
use tracing::{debug, error, info, warn};

use pdns_operator::constants::{
    DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_RETRY_PERIOD_SECS, DEFAULT_METRICS_ADDR,
    DEFAULT_PROBE_ADDR, ERROR_REQUEUE_SECS, TOKIO_WORKER_THREADS,
};
use pdns_operator::context::{Context, Stores};
use pdns_operator::crd::{ClusterRRset, ClusterZone, Provider, RRset, Zone};
use pdns_operator::metrics;
use pdns_operator::reconcilers::{provider, rrset, zone};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("pdns-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initializes logging, honoring `RUST_LOG` (default `info`) and
/// `RUST_LOG_FORMAT` (`json` or `text`, default `text`).
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .compact()
                .init();
        }
    }

    info!("starting pdns-operator");
}

/// Spawns one reflector per CRD kind and returns the shared [`Context`]
/// plus a flag flipped once every store has completed its initial sync
/// (consumed by `/readyz`).
async fn initialize_shared_context(client: Client) -> (Arc<Context>, Arc<AtomicBool>) {
    let providers_api = Api::<Provider>::all(client.clone());
    let zones_api = Api::<Zone>::all(client.clone());
    let cluster_zones_api = Api::<ClusterZone>::all(client.clone());
    let rrsets_api = Api::<RRset>::all(client.clone());
    let cluster_rrsets_api = Api::<ClusterRRset>::all(client.clone());

    let (providers_store, providers_writer) = reflector::store();
    let (zones_store, zones_writer) = reflector::store();
    let (cluster_zones_store, cluster_zones_writer) = reflector::store();
    let (rrsets_store, rrsets_writer) = reflector::store();
    let (cluster_rrsets_store, cluster_rrsets_writer) = reflector::store();

    let providers_ready = providers_store.wait_until_ready();
    let zones_ready = zones_store.wait_until_ready();
    let cluster_zones_ready = cluster_zones_store.wait_until_ready();
    let rrsets_ready = rrsets_store.wait_until_ready();
    let cluster_rrsets_ready = cluster_rrsets_store.wait_until_ready();

    tokio::spawn(async move {
        let stream = watcher(providers_api, watcher::Config::default());
        reflector(providers_writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("Provider reflector stream ended");
    });
    tokio::spawn(async move {
        let stream = watcher(zones_api, watcher::Config::default());
        reflector(zones_writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("Zone reflector stream ended");
    });
    tokio::spawn(async move {
        let stream = watcher(cluster_zones_api, watcher::Config::default());
        reflector(cluster_zones_writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("ClusterZone reflector stream ended");
    });
    tokio::spawn(async move {
        let stream = watcher(rrsets_api, watcher::Config::default());
        reflector(rrsets_writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("RRset reflector stream ended");
    });
    tokio::spawn(async move {
        let stream = watcher(cluster_rrsets_api, watcher::Config::default());
        reflector(cluster_rrsets_writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("ClusterRRset reflector stream ended");
    });

    let stores = Stores {
        providers: providers_store,
        zones: zones_store,
        cluster_zones: cluster_zones_store,
        rrsets: rrsets_store,
        cluster_rrsets: cluster_rrsets_store,
    };
    let context = Arc::new(Context { client, stores });

    let ready = Arc::new(AtomicBool::new(false));
    let ready_setter = ready.clone();
    tokio::spawn(async move {
        let _ = tokio::join!(
            providers_ready,
            zones_ready,
            cluster_zones_ready,
            rrsets_ready,
            cluster_rrsets_ready
        );
        info!("all reflector stores have completed their initial sync");
        ready_setter.store(true, Ordering::Release);
    });

    (context, ready)
}

fn health_router(ready: Arc<AtomicBool>) -> Router {
    async fn metrics_handler() -> String {
        match metrics::gather_metrics() {
            Ok(text) => text,
            Err(e) => {
                error!("failed to gather metrics: {e}");
                String::from("# failed to gather metrics\n")
            }
        }
    }

    async fn healthz_handler() -> &'static str {
        "ok"
    }

    let readyz_ready = ready.clone();
    let readyz_handler = move || {
        let ready = readyz_ready.clone();
        async move {
            if ready.load(Ordering::Acquire) {
                (axum::http::StatusCode::OK, "ready")
            } else {
                (axum::http::StatusCode::SERVICE_UNAVAILABLE, "not ready")
            }
        }
    };

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
}

/// Binds `router` on `addr` and serves it until the process exits. Errors
/// are logged; the task then returns without retrying the bind.
fn spawn_http_server(addr: SocketAddr, router: Router, label: &'static str) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("failed to bind {label} server to {addr}: {e}");
                return;
            }
        };
        info!("{label} server listening on http://{addr}");
        if let Err(e) = axum::serve(listener, router).await {
            error!("{label} server error: {e}");
        }
    })
}

fn socket_addr_from_env(var: &str, default: &str) -> SocketAddr {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| default.parse().expect("default socket address is well-formed"))
}

struct LeaderElectionConfig {
    enabled: bool,
    lease_name: String,
    lease_namespace: String,
    identity: String,
    lease_duration: u64,
    retry_period: u64,
}

fn load_leader_election_config() -> LeaderElectionConfig {
    let enabled = std::env::var("OPERATOR_ENABLE_LEADER_ELECTION")
        .ok()
        .and_then(|s| s.parse::<bool>().ok())
        .unwrap_or(true);

    let lease_name = std::env::var("OPERATOR_LEASE_NAME").unwrap_or_else(|_| "pdns-operator-leader".to_string());

    let lease_namespace = std::env::var("OPERATOR_LEASE_NAMESPACE")
        .or_else(|_| std::env::var("POD_NAMESPACE"))
        .unwrap_or_else(|_| "default".to_string());

    let identity = std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("pdns-operator-{}", rand::random::<u32>()));

    LeaderElectionConfig {
        enabled,
        lease_name,
        lease_namespace,
        identity,
        lease_duration: DEFAULT_LEASE_DURATION_SECS,
        retry_period: DEFAULT_LEASE_RETRY_PERIOD_SECS,
    }
}

/// One-time best-effort listing of every managed kind, run after acquiring
/// leadership (or immediately, if leader election is disabled), enqueuing
/// each object for reconciliation to close the gap between "operator was
/// down" and "first watch event" (§1, ambient startup behavior).
async fn perform_startup_drift_detection(client: Client, context: Arc<Context>) {
    info!("performing startup drift detection");

    let providers: Api<Provider> = Api::all(client.clone());
    match providers.list(&kube::api::ListParams::default()).await {
        Ok(list) => {
            for p in list.items {
                let name = p.name_any();
                if let Err(e) = Box::pin(provider::reconcile_provider(Arc::new(p), context.clone())).await {
                    warn!(name, error = %e, "startup reconcile of Provider failed");
                }
            }
        }
        Err(e) => warn!(error = %e, "failed to list Provider resources at startup"),
    }

    let zones: Api<Zone> = Api::all(client.clone());
    match zones.list(&kube::api::ListParams::default()).await {
        Ok(list) => {
            for z in list.items {
                let name = z.name_any();
                if let Err(e) = Box::pin(zone::reconcile_zone(Arc::new(z), context.clone())).await {
                    warn!(name, error = %e, "startup reconcile of Zone failed");
                }
            }
        }
        Err(e) => warn!(error = %e, "failed to list Zone resources at startup"),
    }

    let cluster_zones: Api<ClusterZone> = Api::all(client.clone());
    match cluster_zones.list(&kube::api::ListParams::default()).await {
        Ok(list) => {
            for z in list.items {
                let name = z.name_any();
                if let Err(e) = Box::pin(zone::reconcile_cluster_zone(Arc::new(z), context.clone())).await {
                    warn!(name, error = %e, "startup reconcile of ClusterZone failed");
                }
            }
        }
        Err(e) => warn!(error = %e, "failed to list ClusterZone resources at startup"),
    }

    let rrsets: Api<RRset> = Api::all(client.clone());
    match rrsets.list(&kube::api::ListParams::default()).await {
        Ok(list) => {
            for r in list.items {
                let name = r.name_any();
                if let Err(e) = Box::pin(rrset::reconcile_rrset(Arc::new(r), context.clone())).await {
                    warn!(name, error = %e, "startup reconcile of RRset failed");
                }
            }
        }
        Err(e) => warn!(error = %e, "failed to list RRset resources at startup"),
    }

    let cluster_rrsets: Api<ClusterRRset> = Api::all(client.clone());
    match cluster_rrsets.list(&kube::api::ListParams::default()).await {
        Ok(list) => {
            for r in list.items {
                let name = r.name_any();
                if let Err(e) = Box::pin(rrset::reconcile_cluster_rrset(Arc::new(r), context.clone())).await {
                    warn!(name, error = %e, "startup reconcile of ClusterRRset failed");
                }
            }
        }
        Err(e) => warn!(error = %e, "failed to list ClusterRRset resources at startup"),
    }

    info!("startup drift detection complete");
}

/// Runs all five controllers concurrently. None of them are expected to
/// exit on their own; if one does, the others are abandoned and the
/// process exits so Kubernetes can restart it.
async fn run_all_controllers(context: Arc<Context>) -> Result<()> {
    let client = context.client.clone();

    let providers_api = Api::<Provider>::all(client.clone());
    let zones_api = Api::<Zone>::all(client.clone());
    let cluster_zones_api = Api::<ClusterZone>::all(client.clone());
    let rrsets_api = Api::<RRset>::all(client.clone());
    let cluster_rrsets_api = Api::<ClusterRRset>::all(client.clone());

    tokio::select! {
        () = Controller::new(providers_api, watcher::Config::default())
            .run(provider::reconcile_provider, provider::error_policy, context.clone())
            .for_each(|_| futures::future::ready(())) => {
            anyhow::bail!("Provider controller exited unexpectedly")
        }
        () = Controller::new(zones_api, watcher::Config::default())
            .run(zone::reconcile_zone, zone::error_policy, context.clone())
            .for_each(|_| futures::future::ready(())) => {
            anyhow::bail!("Zone controller exited unexpectedly")
        }
        () = Controller::new(cluster_zones_api, watcher::Config::default())
            .run(zone::reconcile_cluster_zone, zone::error_policy, context.clone())
            .for_each(|_| futures::future::ready(())) => {
            anyhow::bail!("ClusterZone controller exited unexpectedly")
        }
        () = Controller::new(rrsets_api, watcher::Config::default())
            .run(rrset::reconcile_rrset, rrset::error_policy, context.clone())
            .for_each(|_| futures::future::ready(())) => {
            anyhow::bail!("RRset controller exited unexpectedly")
        }
        () = Controller::new(cluster_rrsets_api, watcher::Config::default())
            .run(rrset::reconcile_cluster_rrset, rrset::error_policy, context.clone())
            .for_each(|_| futures::future::ready(())) => {
            anyhow::bail!("ClusterRRset controller exited unexpectedly")
        }
    }
}

async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!("received SIGINT, shutting down");
            result.map_err(anyhow::Error::from)
        }
        result = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                sigterm.recv().await;
                Ok::<(), anyhow::Error>(())
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
                Ok::<(), anyhow::Error>(())
            }
        } => {
            info!("received SIGTERM, shutting down");
            result
        }
    }
}

/// Awaits leadership loss on `leader_rx`, returning `Ok(())` once lost.
async fn monitor_leadership(mut leader_rx: tokio::sync::watch::Receiver<bool>) -> Result<()> {
    loop {
        leader_rx.changed().await?;
        if !*leader_rx.borrow() {
            return Ok(());
        }
    }
}

async fn run_with_leader_election(client: Client, context: Arc<Context>, config: LeaderElectionConfig) -> Result<()> {
    info!(
        lease_name = %config.lease_name,
        lease_namespace = %config.lease_namespace,
        identity = %config.identity,
        "leader election enabled, waiting to acquire leadership"
    );

    let lease_manager = LeaseManagerBuilder::new(client, &config.lease_name)
        .with_namespace(&config.lease_namespace)
        .with_identity(&config.identity)
        .with_duration(config.lease_duration)
        .with_grace(config.retry_period)
        .build()
        .await?;

    let (leader_rx, _lease_handle) = lease_manager.watch().await;

    let mut rx = leader_rx.clone();
    while !*rx.borrow_and_update() {
        rx.changed().await?;
    }
    info!("leadership acquired, starting controllers");
    metrics::record_leader_elected();

    perform_startup_drift_detection(context.client.clone(), context.clone()).await;

    tokio::select! {
        result = wait_for_shutdown_signal() => result,
        result = monitor_leadership(leader_rx) => {
            match result {
                Ok(()) => {
                    warn!("leadership lost, stepping down");
                    metrics::record_leader_lost();
                    anyhow::bail!("leadership lost")
                }
                Err(e) => anyhow::bail!("leadership monitor failed: {e}"),
            }
        }
        result = run_all_controllers(context) => result,
    }
}

async fn run_without_leader_election(context: Arc<Context>) -> Result<()> {
    warn!("leader election disabled, running as a single unelected instance");
    perform_startup_drift_detection(context.client.clone(), context.clone()).await;

    tokio::select! {
        result = wait_for_shutdown_signal() => result,
        result = run_all_controllers(context) => result,
    }
}

async fn async_main() -> Result<()> {
    initialize_logging();

    let kube_config = kube::Config::infer().await?;
    let client = Client::try_from(kube_config)?;
    info!("kubernetes client initialized");

    let (context, ready) = initialize_shared_context(client.clone()).await;

    let metrics_addr = socket_addr_from_env("OPERATOR_METRICS_ADDR", DEFAULT_METRICS_ADDR);
    let probe_addr = socket_addr_from_env("OPERATOR_PROBE_ADDR", DEFAULT_PROBE_ADDR);
    let router = health_router(ready);
    let _metrics_handle = spawn_http_server(metrics_addr, router.clone(), "metrics");
    let _probe_handle = spawn_http_server(probe_addr, router, "probe");

    let leader_election_config = load_leader_election_config();
    debug!(
        enabled = leader_election_config.enabled,
        "leader election configuration loaded"
    );

    if leader_election_config.enabled {
        run_with_leader_election(client, context, leader_election_config).await
    } else {
        run_without_leader_election(context).await
    }
}

#[cfg(test)]
mod main_tests;
