//! Scheduling core binary: wires C6-C12 together and serves `/health` plus
//! the websocket subscription route (§0, §5).

use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use drone_bus::{BusClient, InProcessBus, RedisBus};
use drone_orchestrator::alert_queue::AlertQueue;
use drone_orchestrator::config::Config;
use drone_orchestrator::detection_ingest::DetectionIngestor;
use drone_orchestrator::dispatch::MissionDispatcher;
use drone_orchestrator::fanout::FanoutHub;
use drone_orchestrator::registry::UavRegistry;
use drone_orchestrator::scheduler::Scheduler;
use drone_orchestrator::telemetry_ingest::TelemetryIngestor;
use drone_persistence::{
    shared_cache, AlertRepository, CacheClient, CacheConfig, ScyllaAlertRepository, ScyllaClient,
    ScyllaConfig as PersistenceScyllaConfig, ScyllaDetectionRepository, ScyllaMissionRepository,
    ScyllaTelemetryRepository, ScyllaTileRepository, ScyllaUavRepository, ScyllaWaypointRepository,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Clone)]
struct AppState {
    hub: Arc<FanoutHub>,
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move { state.hub.handle_socket(socket).await })
}

fn build_router(hub: Arc<FanoutHub>) -> Router {
    let state = AppState { hub };
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(fmt::layer().json())
        .init();

    tracing::info!(version = drone_orchestrator::VERSION, "starting drone-orchestrator");

    let scylla_config = PersistenceScyllaConfig {
        hosts: config.scylla.hosts.clone(),
        keyspace: config.scylla.keyspace.clone(),
        username: config.scylla.username.clone(),
        password: config.scylla.password.clone(),
        ..PersistenceScyllaConfig::default()
    };
    let scylla = ScyllaClient::new(scylla_config).await?;

    let cache_config = CacheConfig {
        url: config.redis.url.clone(),
        pool_size: config.redis.pool_size,
        ..CacheConfig::default()
    };
    let cache = shared_cache(CacheClient::new(cache_config).await?);

    let tiles = Arc::new(ScyllaTileRepository::new(scylla.clone()));
    let uavs = Arc::new(ScyllaUavRepository::new(scylla.clone(), Some(cache.clone())));
    let alerts = Arc::new(ScyllaAlertRepository::new(scylla.clone()));
    let missions = Arc::new(ScyllaMissionRepository::new(scylla.clone()));
    let waypoints = Arc::new(ScyllaWaypointRepository::new(scylla.clone()));
    let detections = Arc::new(ScyllaDetectionRepository::new(scylla.clone()));
    let telemetry = Arc::new(ScyllaTelemetryRepository::new(scylla.clone(), Some(cache.clone())));

    let bus: Arc<dyn BusClient> = if let Some(url) = config.bus.redis_url.clone() {
        Arc::new(RedisBus::connect(&url).await?)
    } else {
        Arc::new(InProcessBus::new())
    };
    bus.connect().await?;

    let registry = Arc::new(UavRegistry::new(uavs));
    registry.load_from_repo().await?;

    let queue = Arc::new(AlertQueue::new(10_000));
    let pending = alerts
        .get_by_status(drone_domain::AlertStatus::New, drone_domain::Pagination::default())
        .await?;
    let queued = alerts
        .get_by_status(drone_domain::AlertStatus::Queued, drone_domain::Pagination::default())
        .await?;
    for alert in pending.into_iter().chain(queued) {
        queue.offer(alert)?;
    }

    let hub = Arc::new(FanoutHub::new(config.fanout.clone()));

    let dispatcher = Arc::new(MissionDispatcher::new(
        config.dispatch.clone(),
        missions.clone(),
        waypoints,
        tiles.clone(),
        alerts.clone(),
        bus.clone(),
        registry.clone(),
        queue.clone(),
        hub.clone(),
    ));

    let (scheduler, fast_path_rx) = Scheduler::new(
        config.scheduler.clone(),
        queue.clone(),
        registry.clone(),
        tiles,
        alerts.clone(),
        dispatcher.clone(),
        bus.clone(),
        hub.clone(),
    );
    scheduler.spawn_alert_ingest();
    tokio::spawn(scheduler.clone().run(fast_path_rx));

    let telemetry_ingestor = Arc::new(TelemetryIngestor::new(
        config.telemetry.clone(),
        bus.clone(),
        registry.clone(),
        telemetry,
        dispatcher.clone(),
        hub.clone(),
    ));
    tokio::spawn(telemetry_ingestor.run());

    let detection_ingestor = Arc::new(DetectionIngestor::new(
        config.detection.clone(),
        bus.clone(),
        detections,
        registry.clone(),
        hub.clone(),
    ));
    tokio::spawn(detection_ingestor.run());

    let app = build_router(hub);
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    tracing::info!(addr = %config.server_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
