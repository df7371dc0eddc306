//! FlowForge: workflow graph editing service with worker liveness tracking
//!
//! Holds the editor's node/edge graph in memory and tracks a fleet of
//! workers through a register/heartbeat protocol, broadcasting state changes
//! to WebSocket subscribers.

// Core configuration and setup
pub mod config;

// Error taxonomy
pub mod error;

// Workflow graph layer - node/edge store, canvas deltas, import/export
pub mod workflow;

// Worker liveness layer - registry, heartbeat sweep, broadcast, worker client
pub mod liveness;

// HTTP API layer - REST endpoints and the worker event WebSocket
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{FlowForgeError, Result};
pub use liveness::{LivenessTracker, NodeEvent, Worker};
pub use server::start_server;
pub use workflow::{GraphEdge, GraphNode, GraphStore, NodeKind};
