//! In-memory workflow graph store using ArcSwap
//!
//! The store is the single source of truth for the node and edge collections
//! the canvas renders. Readers get a lock-free snapshot; each mutation builds
//! the next state from the current one and swaps the whole pointer, so no
//! reader ever sees a half-applied change. Absent ids are silent no-ops.

use crate::workflow::changes::{self, EdgeChange, NodeChange};
use crate::workflow::types::{
    Attributes, Connection, GraphEdge, GraphNode, RuntimeReport, WorkflowSnapshot,
};
use arc_swap::ArcSwap;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Name given to a graph that has never been named by an import
pub const DEFAULT_WORKFLOW_NAME: &str = "Untitled Workflow";

const SUCCESS_BORDER: &str = "2px solid #10B981";
const FAILURE_BORDER: &str = "2px solid #EF4444";

/// Immutable view of the graph at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphState {
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphState {
    /// First node carrying `id`. With duplicate ids the earliest insert wins.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    fn has_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }
}

/// Notification sent to store observers after a mutation lands
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    NodeAdded { id: String },
    NodeRemoved { id: String, edges_removed: usize },
    NodeUpdated { id: String },
    NodeStyled { id: String },
    /// A fan node's path count changed; the renderer must re-layout its handles
    HandleCountChanged { id: String, count: u32 },
    /// Run report applied: style and `data.runtime` changed together
    RuntimeRecorded { id: String, success: bool },
    EdgeAdded { id: String },
    EdgeRemoved { id: String },
    NodesReplaced { count: usize },
    EdgesReplaced { count: usize },
    Imported { nodes: usize, edges: usize },
    ChangesApplied { nodes: usize, edges: usize },
    RuntimeCleared,
}

/// Mutable node/edge store with observer notifications
///
/// Writers race through `ArcSwap::rcu`, which retries a mutation against the
/// latest state if another writer swapped in between, so every call applies
/// atomically with respect to the others.
#[derive(Debug)]
pub struct GraphStore {
    state: ArcSwap<GraphState>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create an empty store whose observers may fall `capacity` events behind
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            state: ArcSwap::new(Arc::new(GraphState {
                name: DEFAULT_WORKFLOW_NAME.to_string(),
                ..GraphState::default()
            })),
            events,
        }
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Lock-free snapshot of the current graph
    pub fn state(&self) -> Arc<GraphState> {
        self.state.load_full()
    }

    pub fn nodes(&self) -> Vec<GraphNode> {
        self.state.load().nodes.clone()
    }

    pub fn edges(&self) -> Vec<GraphEdge> {
        self.state.load().edges.clone()
    }

    pub fn node(&self, id: &str) -> Option<GraphNode> {
        self.state.load().node(id).cloned()
    }

    pub fn name(&self) -> String {
        self.state.load().name.clone()
    }

    /// Append a node. Callers guarantee id uniqueness; no check is made.
    pub fn add_node(&self, node: GraphNode) {
        let id = node.id.clone();
        self.commit(|current| {
            let mut next = current.clone();
            next.nodes.push(node.clone());
            Some((next, vec![StoreEvent::NodeAdded { id: id.clone() }]))
        });
    }

    /// Remove a node and every edge that references it
    pub fn remove_node(&self, id: &str) {
        self.commit(|current| {
            if !current.has_node(id) {
                return None;
            }
            let mut next = current.clone();
            next.nodes.retain(|node| node.id != id);
            let before = next.edges.len();
            next.edges.retain(|edge| !edge.references(id));
            let edges_removed = before - next.edges.len();
            Some((
                next,
                vec![StoreEvent::NodeRemoved {
                    id: id.to_string(),
                    edges_removed,
                }],
            ))
        });
    }

    pub fn remove_edge(&self, id: &str) {
        self.commit(|current| {
            current.edge(id)?;
            let mut next = current.clone();
            next.edges.retain(|edge| edge.id != id);
            Some((next, vec![StoreEvent::EdgeRemoved { id: id.to_string() }]))
        });
    }

    /// Shallow-merge `partial` into the node's data, keeping unspecified fields.
    ///
    /// The merge always lands; values that do not fit the node's variant stay
    /// in its data as sent. When the merge changes a fan node's parallel path
    /// count a [`StoreEvent::HandleCountChanged`] follows the update.
    pub fn update_node(&self, id: &str, partial: &Attributes) {
        self.commit(|current| {
            if !current.has_node(id) {
                return None;
            }
            let mut next = current.clone();
            let mut events = vec![StoreEvent::NodeUpdated { id: id.to_string() }];
            for node in next.nodes.iter_mut().filter(|node| node.id == id) {
                let before = node.data.kind().handle_count();
                node.data.merge(partial);
                let after = node.data.kind().handle_count();
                if events.len() == 1 {
                    if let Some(count) = after.filter(|count| Some(*count) != before) {
                        events.push(StoreEvent::HandleCountChanged {
                            id: id.to_string(),
                            count,
                        });
                    }
                }
            }
            Some((next, events))
        });
    }

    /// Replace (not merge) the node's presentation style
    pub fn update_node_style(&self, id: &str, style: Option<Value>) {
        self.commit(|current| {
            if !current.has_node(id) {
                return None;
            }
            let mut next = current.clone();
            for node in next.nodes.iter_mut().filter(|node| node.id == id) {
                node.style = style.clone();
            }
            Some((next, vec![StoreEvent::NodeStyled { id: id.to_string() }]))
        });
    }

    /// Replace both collections wholesale. Referential integrity is not checked.
    pub fn import_workflow(&self, nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) {
        let event = StoreEvent::Imported {
            nodes: nodes.len(),
            edges: edges.len(),
        };
        self.commit(|current| {
            let next = GraphState {
                name: current.name.clone(),
                nodes: nodes.clone(),
                edges: edges.clone(),
            };
            Some((next, vec![event.clone()]))
        });
    }

    /// Import a parsed snapshot, adopting its name when it has one
    pub fn import_snapshot(&self, snapshot: WorkflowSnapshot) {
        let WorkflowSnapshot {
            name, nodes, edges, ..
        } = snapshot;
        let event = StoreEvent::Imported {
            nodes: nodes.len(),
            edges: edges.len(),
        };
        self.commit(|current| {
            let name = if name.trim().is_empty() {
                current.name.clone()
            } else {
                name.clone()
            };
            Some((
                GraphState {
                    name,
                    nodes: nodes.clone(),
                    edges: edges.clone(),
                },
                vec![event.clone()],
            ))
        });
        tracing::info!("📥 Imported workflow snapshot: {}", self.name());
    }

    /// Capture the current graph for download or transfer
    pub fn export_snapshot(&self) -> WorkflowSnapshot {
        let state = self.state.load();
        WorkflowSnapshot {
            name: state.name.clone(),
            nodes: state.nodes.clone(),
            edges: state.edges.clone(),
            exported_at: Some(chrono::Utc::now()),
        }
    }

    pub fn set_nodes(&self, nodes: Vec<GraphNode>) {
        let count = nodes.len();
        self.commit(|current| {
            let mut next = current.clone();
            next.nodes = nodes.clone();
            Some((next, vec![StoreEvent::NodesReplaced { count }]))
        });
    }

    pub fn set_edges(&self, edges: Vec<GraphEdge>) {
        let count = edges.len();
        self.commit(|current| {
            let mut next = current.clone();
            next.edges = edges.clone();
            Some((next, vec![StoreEvent::EdgesReplaced { count }]))
        });
    }

    /// Connect two existing nodes. Returns the new edge id, or `None` when an
    /// endpoint is missing or the same handles are already connected.
    pub fn connect(&self, connection: Connection) -> Option<String> {
        let edge_id = connection.edge_id();
        let event = self.commit(|current| {
            if !current.has_node(&connection.source) || !current.has_node(&connection.target) {
                return None;
            }
            if current.edges.iter().any(|edge| connection.matches(edge)) {
                return None;
            }
            let mut next = current.clone();
            next.edges.push(connection.clone().into_edge());
            Some((next, vec![StoreEvent::EdgeAdded { id: edge_id.clone() }]))
        });
        event.map(|_| edge_id)
    }

    /// Fold canvas deltas into the store. Node removals cascade to edges.
    pub fn apply_changes(&self, node_changes: &[NodeChange], edge_changes: &[EdgeChange]) {
        let removed = changes::removed_node_ids(node_changes);
        self.commit(|current| {
            let mut next = current.clone();
            next.nodes = changes::apply_node_changes(node_changes, &current.nodes);
            next.edges = changes::apply_edge_changes(edge_changes, &current.edges);
            if !removed.is_empty() {
                next.edges
                    .retain(|edge| !removed.contains(&edge.source) && !removed.contains(&edge.target));
            }
            let event = StoreEvent::ChangesApplied {
                nodes: node_changes.len(),
                edges: edge_changes.len(),
            };
            Some((next, vec![event]))
        });
    }

    /// Reflect a run-channel report on the node: border colour and `data.runtime`,
    /// applied together in one commit
    pub fn record_runtime(&self, report: &RuntimeReport) {
        let border = if report.is_success {
            SUCCESS_BORDER
        } else {
            tracing::warn!("Node {} reported a failed run: {:?}", report.node_id, report.error);
            FAILURE_BORDER
        };
        let runtime = serde_json::to_value(report).unwrap_or(Value::Null);
        let id = report.node_id.as_str();

        self.commit(|current| {
            if !current.has_node(id) {
                return None;
            }
            let mut next = current.clone();
            for node in next.nodes.iter_mut().filter(|node| node.id == id) {
                node.style = Some(json!({ "border": border }));
                node.data.insert("runtime", runtime.clone());
            }
            Some((
                next,
                vec![StoreEvent::RuntimeRecorded {
                    id: id.to_string(),
                    success: report.is_success,
                }],
            ))
        });
    }

    /// Drop run output and styling from every node before a fresh run
    pub fn clear_runtime_state(&self) {
        self.commit(|current| {
            let mut next = current.clone();
            for node in &mut next.nodes {
                node.data.remove("runtime");
                node.style = None;
            }
            Some((next, vec![StoreEvent::RuntimeCleared]))
        });
    }

    /// Apply `op` atomically and publish its events.
    ///
    /// `op` returns `None` to leave the state untouched. It may run more than
    /// once under contention; only the events of the attempt that landed are
    /// published. Returns the first published event.
    fn commit<F>(&self, mut op: F) -> Option<StoreEvent>
    where
        F: FnMut(&GraphState) -> Option<(GraphState, Vec<StoreEvent>)>,
    {
        let mut landed = Vec::new();
        self.state.rcu(|current| match op(current.as_ref()) {
            Some((next, events)) => {
                landed = events;
                Arc::new(next)
            }
            None => {
                landed.clear();
                Arc::clone(current)
            }
        });

        let first = landed.first().cloned();
        for event in landed {
            // No observers is fine
            let _ = self.events.send(event);
        }
        first
    }
}
