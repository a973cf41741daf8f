//! API error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use vigil_engine::EngineError;
use vigil_storage::StorageError;

/// Errors surfaced to HTTP clients.
///
/// Every failure body has the shape `{"error": "..."}`; the variant picks
/// the status code. Internal detail is logged, never leaked to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body or parameters were invalid.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unrecognized credential.
    #[error("invalid or missing credential")]
    Unauthorized,

    /// Valid credential, insufficient authority.
    #[error("forbidden")]
    Forbidden,

    /// The resource does not exist (or is not visible to this caller).
    #[error("not found")]
    NotFound,

    /// The request conflicts with the resource's current state.
    #[error("{0}")]
    Conflict(String),

    /// Something on our side broke.
    #[error("internal error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::AgentNotFound(_) | EngineError::ApprovalNotFound(_) => Self::NotFound,
            EngineError::InvalidTransition { .. } => Self::Conflict(e.to_string()),
            EngineError::MalformedEvent(msg) => Self::BadRequest(msg),
            EngineError::Storage(e) => Self::from(e),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => Self::NotFound,
            other => {
                tracing::error!(error = %other, "storage failure");
                Self::Internal
            },
        }
    }
}
