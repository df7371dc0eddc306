//! Error taxonomy shared by the worker tracker and the graph import boundary.
//!
//! Graph store mutations never fail outward; only tracker operations and
//! payload parsing produce these errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowForgeError {
    /// Malformed or incomplete input, e.g. a registration without an address.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An operation referenced a worker id the tracker does not know.
    #[error("Worker not found: {0}")]
    NotFound(u32),

    /// Unparseable JSON on an inbound channel or import payload.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<serde_json::Error> for FlowForgeError {
    fn from(err: serde_json::Error) -> Self {
        FlowForgeError::MalformedPayload(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FlowForgeError>;
