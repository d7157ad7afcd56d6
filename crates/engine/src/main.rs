//! AmbonMUD engine binary: composition root. Loads configuration and the
//! world, wires the ambient ports, starts the telnet and WebSocket
//! listeners plus the admin HTTP surface, and drives the tick loop until a
//! shutdown signal arrives.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ambonmud_engine::admin::AdminSnapshot;
use ambonmud_engine::engine::{run_tick_loop, EngineDeps, GameEngine};
use ambonmud_engine::telnet::TelnetLimits;
use ambonmud_engine::transport::websocket::{ws_handler, WsState};
use ambonmud_engine::outbound_router::OutboundRouter;
use ambonmud_engine::transport::{telnet_transport, SessionIds};
use ambonmud_engine::world::{load_world, read_zone_directory};
use ambonmud_engine::{bus, content, outbound_router};
use ambonmud_shared::repository::{InMemoryPlayerRepository, PlayerRepository, SqlitePlayerRepository};
use ambonmud_shared::{AppConfig, Clock, GameRng, InMemoryMetrics, MetricsSink, NoopMetrics, StdGameRng, SystemClock};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ambonmud_engine=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting ambonmud engine");

    let config = AppConfig::from_env()?;
    tracing::info!(world_dir = %config.world_dir, "configuration loaded");

    let documents = read_zone_directory(Path::new(&config.world_dir))?;
    if documents.is_empty() {
        tracing::warn!(world_dir = %config.world_dir, "no zone documents found; starting with an empty world");
    }
    let world = load_world(&documents, &config.gameplay.mob_tiers, &Default::default())?;
    tracing::info!(rooms = world.rooms.len(), zones = documents.len(), "world loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let rng: Arc<dyn GameRng> = Arc::new(StdGameRng::from_entropy());
    let metrics: Arc<dyn MetricsSink> = match &config.observability.metrics_endpoint {
        Some(_) => Arc::new(InMemoryMetrics::new()),
        None => Arc::new(NoopMetrics),
    };

    let repository: Arc<dyn PlayerRepository> = if config.player_db_path == ":memory:" {
        Arc::new(InMemoryPlayerRepository::new())
    } else {
        let url = format!("sqlite://{}?mode=rwc", config.player_db_path);
        Arc::new(SqlitePlayerRepository::connect(&url).await?)
    };

    let respawn_room = world.start_room.clone();
    let deps = EngineDeps {
        world,
        ability_defs: content::default_ability_defs(),
        status_defs: content::default_status_effect_defs(),
        dialogue_trees: Default::default(),
        respawn_room,
        max_level: config.gameplay.max_level,
        clock: clock.clone(),
        rng,
        metrics: metrics.clone(),
        repository,
        config: config.gameplay.clone(),
    };
    let mut engine = GameEngine::new(deps);

    let (inbound_tx, inbound_rx) = bus::inbound_bus(config.deployment.inbound_channel_capacity);
    let (outbound_tx, outbound_rx) = bus::outbound_bus(config.deployment.outbound_channel_capacity);

    let router: Arc<tokio::sync::Mutex<OutboundRouter>> =
        Arc::new(tokio::sync::Mutex::new(OutboundRouter::new(Duration::from_millis(250))));
    let dispatch_task = tokio::spawn(outbound_router::run_dispatch_loop(outbound_rx, router.clone()));

    let session_ids = Arc::new(SessionIds::new(0, clock.clone()));

    let telnet_listener = tokio::net::TcpListener::bind(("0.0.0.0", config.deployment.telnet_port)).await?;
    let telnet_limits = TelnetLimits {
        max_line_len: config.deployment.telnet_line_max_length,
        max_non_printable_per_line: config.deployment.telnet_max_non_printable_per_line,
        ..TelnetLimits::default()
    };
    let prompt_text: Arc<str> = Arc::from(config.deployment.prompt_text.as_str());
    let telnet_task = tokio::spawn(telnet_transport::serve(
        telnet_listener,
        inbound_tx.clone(),
        router.clone(),
        session_ids.clone(),
        telnet_limits,
        config.deployment.session_outbound_queue_capacity,
        config.deployment.telnet_read_buffer_bytes,
        prompt_text,
    ));

    let admin_snapshot = Arc::new(tokio::sync::RwLock::new(AdminSnapshot::default()));

    let ws_state = WsState {
        inbound_tx: inbound_tx.clone(),
        router: router.clone(),
        session_ids: session_ids.clone(),
        outbound_queue_capacity: config.deployment.session_outbound_queue_capacity,
        max_close_reason_length: config.deployment.web_max_close_reason_length,
        stop_grace_period: Duration::from_millis(config.deployment.web_stop_grace_period_millis),
    };
    let admin_snapshot_for_http = admin_snapshot.clone();
    let app = Router::new()
        .route("/ws", get(ws_handler).with_state(ws_state))
        .route(
            "/admin/snapshot",
            get(move || {
                let snapshot = admin_snapshot_for_http.clone();
                async move { Json(snapshot.read().await.clone()) }
            }),
        )
        .route("/health", get(|| async { "OK" }))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let web_addr: SocketAddr = format!("{}:{}", config.deployment.web_host, config.deployment.web_port).parse()?;
    let web_listener = tokio::net::TcpListener::bind(web_addr).await?;
    tracing::info!(%web_addr, "websocket/admin listener bound");
    let web_task = tokio::spawn(async move {
        if let Err(error) = axum::serve(web_listener, app).await {
            tracing::error!(%error, "web listener stopped");
        }
    });

    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    let tick_period = Duration::from_millis(config.gameplay.engine_tick_millis);
    let inbound_budget = Duration::from_millis(config.gameplay.inbound_budget_ms);
    let tick_task = tokio::spawn(async move {
        run_tick_loop(&mut engine, inbound_rx, outbound_tx, tick_period, inbound_budget, metrics, admin_snapshot, cancel_rx)
            .await;
        engine
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    let _ = cancel_tx.send(true);

    let web_stop_timeout = Duration::from_millis(config.deployment.web_stop_timeout_millis);
    if tokio::time::timeout(web_stop_timeout, &mut web_task).await.is_err() {
        tracing::warn!("web listener did not stop within the grace period; aborting");
        web_task.abort();
    }
    telnet_task.abort();
    dispatch_task.abort();
    let _ = tick_task.await;

    tracing::info!("ambonmud engine stopped");
    Ok(())
}
