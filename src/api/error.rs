//! Maps the error taxonomy onto HTTP responses
//!
//! Body shape: `{"error": "<message>"}`

use crate::error::FlowForgeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError(pub FlowForgeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            FlowForgeError::Validation(_) | FlowForgeError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            FlowForgeError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<FlowForgeError> for ApiError {
    fn from(err: FlowForgeError) -> Self {
        Self(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
