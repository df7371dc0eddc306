//! Workflow Graph Layer
//!
//! Holds the editor's graph state. It provides:
//! - Type definitions (GraphNode, GraphEdge, NodeData, WorkflowSnapshot)
//! - Canvas change deltas and how they fold into the graph
//! - Lock-free graph store using ArcSwap

// Core graph type definitions
pub mod types;

// Canvas interaction deltas (move, select, resize, remove)
pub mod changes;

// Single source of truth for nodes and edges
pub mod store;

// Re-export commonly used types
pub use changes::{EdgeChange, NodeChange};
pub use store::{GraphState, GraphStore, StoreEvent};
pub use types::{
    Attributes, Connection, GraphEdge, GraphNode, NodeData, NodeKind, Position, RuntimeReport,
    WorkflowSnapshot,
};
