//! Workflow graph REST API endpoints
//!
//! Editing operations over the single in-memory graph. Store mutations are
//! idempotent on unknown ids, so most handlers answer 200 regardless and the
//! caller inspects the exported graph for the outcome.

use super::{error::ApiResult, AppState};
use crate::workflow::{
    Attributes, Connection, EdgeChange, GraphNode, NodeChange, NodeData, Position, RuntimeReport,
    WorkflowSnapshot,
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Response for operations that create a graph element
#[derive(Debug, Serialize)]
pub struct ElementResponse {
    pub id: Option<String>,
    pub message: String,
}

/// Request body for node creation
///
/// `data` is the flat node attribute object, e.g. `{"type": "llm", "label": "Summarize"}`.
#[derive(Debug, Deserialize)]
pub struct AddNodeRequest {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
}

/// A batch of canvas deltas
#[derive(Debug, Default, Deserialize)]
pub struct ChangeBatch {
    #[serde(default)]
    pub nodes: Vec<NodeChange>,
    #[serde(default)]
    pub edges: Vec<EdgeChange>,
}

/// Request body for style replacement; `null` clears the style
#[derive(Debug, Deserialize)]
pub struct StyleRequest {
    #[serde(default)]
    pub style: Option<Value>,
}

/// Create workflow graph routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflow", get(export_workflow).put(import_workflow))
        .route("/api/workflow/nodes", post(add_node))
        .route("/api/workflow/nodes/{id}", delete(remove_node).patch(update_node))
        .route("/api/workflow/nodes/{id}/style", put(update_node_style))
        .route("/api/workflow/edges", post(connect))
        .route("/api/workflow/edges/{id}", delete(remove_edge))
        .route("/api/workflow/changes", post(apply_changes))
        .route("/api/workflow/runtime", post(record_runtime).delete(clear_runtime))
}

/// Export the whole graph
///
/// GET /api/workflow
/// Returns: { "name": "...", "nodes": [...], "edges": [...], "exportedAt": "..." }
/// with a `Content-Disposition` naming the download file.
async fn export_workflow(State(state): State<AppState>) -> Response {
    let snapshot = state.graph.export_snapshot();
    let disposition = format!("attachment; filename=\"{}\"", snapshot.file_name());
    let mut response = Json(snapshot).into_response();
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// Replace the graph with an exported document
///
/// PUT /api/workflow
/// Body: raw exported JSON; `nodes` and `edges` must be arrays
async fn import_workflow(State(state): State<AppState>, body: String) -> ApiResult<Json<Value>> {
    let snapshot = WorkflowSnapshot::from_json(&body).map_err(|e| {
        tracing::warn!("Rejected workflow import: {}", e);
        e
    })?;
    let (nodes, edges) = (snapshot.nodes.len(), snapshot.edges.len());
    state.graph.import_snapshot(snapshot);

    Ok(Json(json!({ "nodes": nodes, "edges": edges, "message": "Workflow imported successfully" })))
}

/// Add a node
///
/// POST /api/workflow/nodes
/// Body: { "id"?: "...", "position"?: { "x": 0, "y": 0 }, "data": { "type": "...", "label": "..." } }
async fn add_node(State(state): State<AppState>, Json(payload): Json<AddNodeRequest>) -> Json<ElementResponse> {
    let AddNodeRequest { id, position, data } = payload;
    let mut node = GraphNode::new(data.kind().clone(), data.label(), position);
    node.data = data;
    if let Some(id) = id {
        node.id = id;
    }
    let id = node.id.clone();
    state.graph.add_node(node);

    tracing::info!("➕ Added node: {}", id);
    Json(ElementResponse {
        id: Some(id),
        message: "Node added".to_string(),
    })
}

/// Merge attributes into a node's data
///
/// PATCH /api/workflow/nodes/{id}
/// Body: { "label"?: "...", "parallelPaths"?: 4, ... }
async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(partial): Json<Attributes>,
) -> Json<Value> {
    state.graph.update_node(&id, &partial);
    Json(json!({ "message": format!("Node '{id}' updated") }))
}

/// PUT /api/workflow/nodes/{id}/style
async fn update_node_style(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StyleRequest>,
) -> Json<Value> {
    state.graph.update_node_style(&id, payload.style);
    Json(json!({ "message": format!("Node '{id}' styled") }))
}

/// Remove a node and every edge touching it
///
/// DELETE /api/workflow/nodes/{id}
async fn remove_node(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    state.graph.remove_node(&id);
    Json(json!({ "message": format!("Node '{id}' removed") }))
}

/// Connect two handles
///
/// POST /api/workflow/edges
/// Body: { "source": "...", "target": "...", "sourceHandle"?: "...", "targetHandle"?: "..." }
/// Returns `id: null` when an endpoint is missing or the connection exists.
async fn connect(State(state): State<AppState>, Json(connection): Json<Connection>) -> Json<ElementResponse> {
    let id = state.graph.connect(connection);
    let message = match &id {
        Some(id) => format!("Edge '{id}' created"),
        None => "Connection refused".to_string(),
    };
    Json(ElementResponse { id, message })
}

/// DELETE /api/workflow/edges/{id}
async fn remove_edge(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    state.graph.remove_edge(&id);
    Json(json!({ "message": format!("Edge '{id}' removed") }))
}

/// Fold canvas deltas into the graph
///
/// POST /api/workflow/changes
/// Body: { "nodes": [{ "type": "position", ... }], "edges": [{ "type": "remove", ... }] }
async fn apply_changes(State(state): State<AppState>, Json(batch): Json<ChangeBatch>) -> Json<Value> {
    state.graph.apply_changes(&batch.nodes, &batch.edges);
    let current = state.graph.state();
    Json(json!({ "nodes": current.nodes, "edges": current.edges }))
}

/// Record a node run report from the run channel
///
/// POST /api/workflow/runtime
/// Body: { "isSuccess": true, "nodeId": "...", "output": ..., "error"?: ..., "input"?: ... }
async fn record_runtime(State(state): State<AppState>, Json(report): Json<RuntimeReport>) -> Json<Value> {
    state.graph.record_runtime(&report);
    Json(json!({ "message": format!("Runtime recorded for '{}'", report.node_id) }))
}

/// DELETE /api/workflow/runtime
async fn clear_runtime(State(state): State<AppState>) -> Json<Value> {
    state.graph.clear_runtime_state();
    Json(json!({ "message": "Runtime state cleared" }))
}
