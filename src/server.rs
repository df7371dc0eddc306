//! Server setup and initialization
//!
//! Wires together the liveness tracker, the graph store, the sweeper and the
//! HTTP/WebSocket routes.

use crate::{
    api::{create_event_routes, create_node_routes, create_worker_routes, create_workflow_routes, AppState},
    config::Config,
    liveness::{HeartbeatSweeper, LivenessTracker, SystemClock},
    workflow::GraphStore,
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

/// Build shared state backed by the wall clock
pub fn create_state(config: &Config) -> AppState {
    tracing::info!("🛰️ Initializing liveness tracker");
    let tracker = Arc::new(LivenessTracker::new(&config.liveness, Arc::new(SystemClock)));

    tracing::info!("📊 Initializing workflow graph store");
    let graph = Arc::new(GraphStore::with_capacity(config.liveness.broadcast_capacity));

    AppState { tracker, graph }
}

/// Assemble every route over the given state
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Worker protocol and administration
        .merge(create_worker_routes())
        .merge(create_node_routes())
        .merge(create_event_routes())
        // Workflow graph editing
        .merge(create_workflow_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create the main Axum application with all routes and middleware
///
/// The background sweep is not started here; see [`start_server`].
pub fn create_app(config: Config) -> Result<Router> {
    config.validate()?;
    let app = build_router(create_state(&config));
    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Start the HTTP server with the given configuration
///
/// Runs until Ctrl-C, then stops the sweeper and drains connections.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("flowforge=info,tower_http=info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting FlowForge server...");
    config.validate()?;

    let bind_addr = config.bind_addr();
    let sweep_interval = config.liveness.sweep_interval();
    let state = create_state(&config);

    let cancel = CancellationToken::new();
    let sweeper = HeartbeatSweeper::new(state.tracker.clone(), sweep_interval, cancel.clone()).spawn();

    let app = build_router(state);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on http://{}", bind_addr);

    let signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down...");
        signal.cancel();
    });

    let shutdown = cancel.clone();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    cancel.cancel();
    sweeper.await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
