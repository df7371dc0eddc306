//! Worker registration protocol endpoints
//!
//! Bodies are parsed by hand so malformed JSON maps onto the error taxonomy
//! instead of the extractor's plain-text rejection.

use super::{error::ApiResult, AppState};
use crate::liveness::{HeartbeatAck, MetricsAck, RegisterRequest, Registration, WorkerReport};
use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use serde::de::DeserializeOwned;

pub fn create_worker_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/workers/register", post(register_worker))
        .route("/api/v1/workers/{id}/heartbeat", post(heartbeat))
        .route("/api/v1/workers/{id}/metrics", post(report_metrics))
}

/// Decode a JSON body; an empty body reads as the type's default
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

/// POST /api/v1/workers/register
/// Body: { "address": "10.0.0.5", "name"?: "...", "port"?: 8080, "cpu_cores"?: 4, ... }
/// Returns: { "worker_id": 1, "status": "registered", "heartbeat_interval_ms": 30000 }
async fn register_worker(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Registration>> {
    let request: RegisterRequest = parse_body(&body)?;
    Ok(Json(state.tracker.register(request).await?))
}

/// POST /api/v1/workers/{id}/heartbeat
/// Body: { "cpu"?: {...}, "memory"?: {...}, "disk"?: [...], "tasks"?: [...] }
async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    body: Bytes,
) -> ApiResult<Json<HeartbeatAck>> {
    let report: WorkerReport = parse_body(&body)?;
    Ok(Json(state.tracker.heartbeat(id, report).await?))
}

/// POST /api/v1/workers/{id}/metrics
async fn report_metrics(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    body: Bytes,
) -> ApiResult<Json<MetricsAck>> {
    let report: WorkerReport = parse_body(&body)?;
    Ok(Json(state.tracker.report_metrics(id, report).await?))
}
