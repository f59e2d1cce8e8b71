//! Service-level error type: the five error kinds the HTTP boundary needs
//! to distinguish, independent of which crate underneath actually raised
//! them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// `POST /simulate` (or a streaming endpoint) called with no markers
    /// stored yet.
    #[error("No markers placed for simulation")]
    EmptyInput,

    /// A marker submitted to `POST /markers` had an unknown `type` or
    /// out-of-range coordinates.
    #[error("invalid marker: {reason}")]
    InvalidMarker { reason: String },

    /// The road graph had no edges after ingestion; fatal to a single run,
    /// but the orchestrator catches this internally and falls back to the
    /// closed-form estimator rather than letting it reach the HTTP layer —
    /// retained here for the `error` SSE frame case.
    #[error("road graph has no edges to simulate over")]
    GraphEmpty,

    /// Cancellation or an internal panic cut a streaming run short.
    #[error("simulation aborted: {reason}")]
    SimulationAborted { reason: String },

    #[error(transparent)]
    Output(#[from] tw_output::OutputError),

    /// A stored record's JSON payload failed to parse back into a domain
    /// type, or a response failed to serialize for persistence.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            ServiceError::EmptyInput => StatusCode::BAD_REQUEST,
            ServiceError::InvalidMarker { .. } => StatusCode::BAD_REQUEST,
            ServiceError::GraphEmpty => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::SimulationAborted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Output(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `POST /markers`/`POST /simulate` respond with a bare `{message}` body
/// on error, not a structured error code.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        (status, Json(json!({ "message": message }))).into_response()
    }
}
