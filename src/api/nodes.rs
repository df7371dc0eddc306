//! Worker administration endpoints

use super::{error::ApiResult, ApiError, AppState};
use crate::{error::FlowForgeError, liveness::Worker};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, put},
    Router,
};
use serde::Serialize;

/// Acknowledgement for administrative commands
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
}

impl CommandResponse {
    fn ok(message: String) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

pub fn create_node_routes() -> Router<AppState> {
    Router::new()
        .route("/api/nodes", get(list_workers))
        .route("/api/nodes/{id}", get(get_worker).delete(delete_worker))
        .route("/api/nodes/{id}/online", put(set_online))
        .route("/api/nodes/{id}/offline", put(set_offline))
}

/// GET /api/nodes
async fn list_workers(State(state): State<AppState>) -> Json<Vec<Worker>> {
    Json(state.tracker.list().await)
}

/// GET /api/nodes/{id}
async fn get_worker(State(state): State<AppState>, Path(id): Path<u32>) -> ApiResult<Json<Worker>> {
    state
        .tracker
        .get(id)
        .await
        .map(Json)
        .ok_or(ApiError(FlowForgeError::NotFound(id)))
}

/// PUT /api/nodes/{id}/online
async fn set_online(State(state): State<AppState>, Path(id): Path<u32>) -> ApiResult<Json<CommandResponse>> {
    state.tracker.set_online(id).await?;
    Ok(CommandResponse::ok(format!("Worker {id} set online")))
}

/// PUT /api/nodes/{id}/offline
async fn set_offline(State(state): State<AppState>, Path(id): Path<u32>) -> ApiResult<Json<CommandResponse>> {
    state.tracker.set_offline(id).await?;
    Ok(CommandResponse::ok(format!("Worker {id} set offline")))
}

/// DELETE /api/nodes/{id}
async fn delete_worker(State(state): State<AppState>, Path(id): Path<u32>) -> ApiResult<Json<CommandResponse>> {
    state.tracker.delete(id).await?;
    Ok(CommandResponse::ok(format!("Worker {id} deleted")))
}
