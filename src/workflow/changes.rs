//! Structural deltas produced by canvas interaction
//!
//! The canvas reports drags, selection, measured sizes and deletions as
//! already-applied changes. These helpers fold a batch of them into the
//! current node/edge lists positionally, keeping element order stable.

use crate::workflow::types::{GraphEdge, GraphNode, Position};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    #[serde(rename_all = "camelCase")]
    Position {
        id: String,
        #[serde(default)]
        position: Option<Position>,
        #[serde(default)]
        dragging: Option<bool>,
    },
    Select {
        id: String,
        selected: bool,
    },
    Dimensions {
        id: String,
        #[serde(default)]
        dimensions: Option<Dimensions>,
    },
    Remove {
        id: String,
    },
    Add {
        item: GraphNode,
    },
    Reset {
        item: GraphNode,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeChange {
    Select { id: String, selected: bool },
    Remove { id: String },
    Add { item: GraphEdge },
    Reset { item: GraphEdge },
}

/// Apply node deltas. A batch containing any `reset` replaces the list with
/// the reset items; otherwise each node is updated in place, removals are
/// dropped and `add` items are appended at the end.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &[GraphNode]) -> Vec<GraphNode> {
    let resets: Vec<GraphNode> = changes
        .iter()
        .filter_map(|change| match change {
            NodeChange::Reset { item } => Some(item.clone()),
            _ => None,
        })
        .collect();
    if !resets.is_empty() {
        return resets;
    }

    let mut by_id: HashMap<&str, Vec<&NodeChange>> = HashMap::new();
    let mut added = Vec::new();
    for change in changes {
        match change {
            NodeChange::Position { id, .. }
            | NodeChange::Select { id, .. }
            | NodeChange::Dimensions { id, .. }
            | NodeChange::Remove { id } => by_id.entry(id.as_str()).or_default().push(change),
            NodeChange::Add { item } => added.push(item.clone()),
            NodeChange::Reset { .. } => {}
        }
    }

    let mut result = Vec::with_capacity(nodes.len() + added.len());
    'nodes: for node in nodes {
        let Some(pending) = by_id.get(node.id.as_str()) else {
            result.push(node.clone());
            continue;
        };
        let mut updated = node.clone();
        for change in pending {
            match change {
                NodeChange::Remove { .. } => continue 'nodes,
                NodeChange::Position {
                    position, dragging, ..
                } => {
                    if let Some(position) = position {
                        updated.position = *position;
                    }
                    if dragging.is_some() {
                        updated.dragging = *dragging;
                    }
                }
                NodeChange::Select { selected, .. } => updated.selected = Some(*selected),
                NodeChange::Dimensions { dimensions, .. } => {
                    if let Some(dimensions) = dimensions {
                        updated.width = Some(dimensions.width);
                        updated.height = Some(dimensions.height);
                    }
                }
                NodeChange::Add { .. } | NodeChange::Reset { .. } => {}
            }
        }
        result.push(updated);
    }
    result.extend(added);
    result
}

/// Apply edge deltas with the same reset/update/append rules as nodes
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &[GraphEdge]) -> Vec<GraphEdge> {
    let resets: Vec<GraphEdge> = changes
        .iter()
        .filter_map(|change| match change {
            EdgeChange::Reset { item } => Some(item.clone()),
            _ => None,
        })
        .collect();
    if !resets.is_empty() {
        return resets;
    }

    let removed: HashSet<&str> = changes
        .iter()
        .filter_map(|change| match change {
            EdgeChange::Remove { id } => Some(id.as_str()),
            _ => None,
        })
        .collect();

    let mut result: Vec<GraphEdge> = edges
        .iter()
        .filter(|edge| !removed.contains(edge.id.as_str()))
        .cloned()
        .map(|mut edge| {
            for change in changes {
                if let EdgeChange::Select { id, selected } = change {
                    if *id == edge.id {
                        edge.selected = Some(*selected);
                    }
                }
            }
            edge
        })
        .collect();

    result.extend(changes.iter().filter_map(|change| match change {
        EdgeChange::Add { item } => Some(item.clone()),
        _ => None,
    }));
    result
}

/// Ids of nodes a batch removes
pub fn removed_node_ids(changes: &[NodeChange]) -> HashSet<String> {
    changes
        .iter()
        .filter_map(|change| match change {
            NodeChange::Remove { id } => Some(id.clone()),
            _ => None,
        })
        .collect()
}
