use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use keyward_auth::{AuthError, HeartbeatError};
use keyward_billing::{QueueError, ReconcileError};
use tracing::error;

/// Errors returned by handlers, rendered as `{"error": msg}`.
///
/// Infrastructure failures get a generic message; details go to the log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid session")]
    InvalidSession,
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::InvalidSignature => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::InvalidSession => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Unavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "try again later".to_string())
            }
            ApiError::Internal(detail) => {
                error!("internal error: {detail}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<HeartbeatError> for ApiError {
    fn from(err: HeartbeatError) -> Self {
        match err {
            HeartbeatError::InvalidSession => ApiError::InvalidSession,
            HeartbeatError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::InvalidSignature => ApiError::InvalidSignature,
            ReconcileError::Malformed(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}
