use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy for the retrieval pipeline.
///
/// The split matters for callers: `InvalidParameter` is caller misuse and is
/// never retried, the two backend variants are transient and retried with
/// bounded backoff before being surfaced, and `DimensionMismatch` is a
/// data-integrity bug that must never be coerced away.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("embedding backend error: {0}")]
    EmbeddingBackend(String),

    #[error("generation backend error: {0}")]
    GenerationBackend(String),

    #[error(
        "dimension mismatch: index holds {expected}-dim '{expected_model}' vectors, \
         got {actual}-dim '{actual_model}'"
    )]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        expected_model: String,
        actual_model: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        RagError::InvalidParameter(msg.into())
    }

    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }
}

/// HTTP-facing error returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::InvalidParameter(msg) => ApiError::BadRequest(msg),
            RagError::NotFound(msg) => ApiError::NotFound(msg),
            RagError::EmbeddingBackend(msg) | RagError::GenerationBackend(msg) => {
                ApiError::ServiceUnavailable(msg)
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
