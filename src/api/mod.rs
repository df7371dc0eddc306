//! HTTP API Layer
//!
//! REST and WebSocket endpoints over the two stores:
//! - Worker registration protocol (register, heartbeat, metrics)
//! - Worker administration (list, inspect, online/offline, delete)
//! - Live worker state-change feed over WebSocket
//! - Workflow graph editing, import/export and run reports

use crate::{liveness::LivenessTracker, workflow::GraphStore};
use std::sync::Arc;

// Error-to-response mapping shared by every handler
pub mod error;

// Worker-facing registration and heartbeat protocol
pub mod workers;

// Operator-facing worker administration
pub mod nodes;

// WebSocket fan-out of worker events
pub mod events;

// Workflow graph editing endpoints
pub mod workflow;

pub use error::ApiError;
pub use events::create_event_routes;
pub use nodes::create_node_routes;
pub use workers::create_worker_routes;
pub use workflow::create_workflow_routes;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Worker registry and heartbeat bookkeeping
    pub tracker: Arc<LivenessTracker>,
    /// Editor graph
    pub graph: Arc<GraphStore>,
}
