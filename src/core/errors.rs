use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the retrieval engine and its collaborators.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding or generation model cannot be initialized.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    /// The persisted index or its chunk metadata is missing or unreadable.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    /// A single generation call failed (transport, quota, malformed response).
    #[error("generation failed: {0}")]
    GenerationFailure(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    pub fn model<E: std::fmt::Display>(err: E) -> Self {
        RagError::ModelUnavailable(err.to_string())
    }

    pub fn index<E: std::fmt::Display>(err: E) -> Self {
        RagError::IndexUnavailable(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        RagError::GenerationFailure(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::ModelUnavailable(msg) | RagError::IndexUnavailable(msg) => {
                ApiError::ServiceUnavailable(msg)
            }
            RagError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
