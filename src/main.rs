//! Main entry point for the FlowForge server. Loads configuration from the
//! environment and serves the worker protocol and graph API.

use flowforge::{config::Config, server::start_server};

/// The server provides:
/// - Worker protocol at /api/v1/workers/*
/// - Worker administration at /api/nodes/*
/// - Worker event feed at /ws/nodes
/// - Workflow graph API at /api/workflow/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (FLOWFORGE_* environment variables over defaults)
    let config = Config::default();

    start_server(config).await
}
