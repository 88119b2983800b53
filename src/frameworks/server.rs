// Framework bootstrap for both session roles.

use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use bytes::Bytes;
use tokio::sync::{Notify, broadcast, mpsc, watch};

use crate::domain::systems::step::StepConfig;
use crate::frameworks::config;
use crate::interface_adapters::headless::{HeadlessRender, NullInput};
use crate::interface_adapters::net::{AppState, connect, frame_broadcaster, ws_handler};
use crate::use_cases::client::{ClientSettings, session_task};
use crate::use_cases::host::{HostSettings, world_task};
use crate::use_cases::types::{GameEvent, WorldUpdate};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

fn step_config() -> StepConfig {
    let mut cfg = StepConfig::default();
    cfg.bullet.max_bounces = config::max_bullet_bounces();
    cfg
}

fn spawn_shutdown_watcher() -> Arc<Notify> {
    let shutdown = Arc::new(Notify::new());
    let notify = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            notify.notify_waiters();
        }
    });
    shutdown
}

/// Runs the authoritative host on an already-bound listener.
pub async fn run_host(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_host_state();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);

    tracing::info!(%address, "hosting session");

    // Serve and report errors rather than panicking.
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_host_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::host_port()));

    // Bind failure is fatal: report and abort startup.
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run_host(listener).await
}

fn build_host_state() -> Arc<AppState> {
    // input_tx/rx: all connection events funnel into the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(config::INPUT_CHANNEL_CAPACITY);

    // update_tx/rx: per-tick world updates out of the world task.
    let (update_tx, _update_rx) =
        broadcast::channel::<WorldUpdate>(config::UPDATE_BROADCAST_CAPACITY);

    // frames_tx/rx: encoded frames shared across all connections.
    let (frames_tx, _frames_rx) = broadcast::channel::<Bytes>(config::FRAME_BROADCAST_CAPACITY);
    let (roster_tx, _roster_rx) = watch::channel::<Bytes>(Bytes::new());

    let shutdown = spawn_shutdown_watcher();

    // The world task owns all simulation state; the host avatar idles on
    // headless ports until a front end drives them.
    tokio::spawn(world_task(
        input_rx,
        update_tx.clone(),
        Box::new(NullInput),
        Box::new(HeadlessRender),
        HostSettings {
            tick_interval: config::TICK_INTERVAL,
            wall_density: config::wall_density(),
            step: step_config(),
        },
        shutdown,
    ));

    // Serialize each update once for all connections.
    tokio::spawn(frame_broadcaster(
        update_tx.subscribe(),
        frames_tx.clone(),
        roster_tx.clone(),
    ));

    Arc::new(AppState {
        input_tx,
        update_tx,
        frames_tx,
        roster_tx,
    })
}

/// Joins a hosted session and runs the client loop until shutdown or the
/// host goes away.
pub async fn run_client_with_config() -> Result<()> {
    init_runtime();

    let cfg = step_config();
    let url = config::server_url();

    // Connection failures abort startup; there is no automatic reconnect.
    let (start, link) = connect(&url, config::HANDSHAKE_TIMEOUT, &cfg.tank)
        .await
        .map_err(|e| {
            tracing::error!(%url, error = ?e, "failed to join session");
            std::io::Error::other(format!("failed to join {url}: {e:?}"))
        })?;

    tracing::info!(player_id = start.local_id, %url, "joined session");

    let shutdown = spawn_shutdown_watcher();
    session_task(
        start,
        link.inbound_rx,
        link.intents_tx,
        Box::new(NullInput),
        Box::new(HeadlessRender),
        ClientSettings {
            tick_interval: config::TICK_INTERVAL,
            step: cfg,
        },
        shutdown,
    )
    .await;

    Ok(())
}
