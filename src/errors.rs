use crate::services::ServiceError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

/// HTTP-facing error: a status, a stable machine code, and a message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: msg.into(),
        }
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", msg)
    }

    /// Shortcut for 401 Unauthorized
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "auth_error", msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let (status, code) = match &err {
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ServiceError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth_error"),
            ServiceError::Ownership { .. } => (StatusCode::FORBIDDEN, "ownership_error"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServiceError::PartLimitExceeded { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "part_limit_exceeded")
            }
            ServiceError::AlreadyCompleted(_) => (StatusCode::CONFLICT, "already_completed"),
            ServiceError::InvalidState { .. } => (StatusCode::CONFLICT, "invalid_state"),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ServiceError::Upstream {
                retryable: true, ..
            } => (StatusCode::SERVICE_UNAVAILABLE, "upstream_retryable"),
            ServiceError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
        };

        if status.is_server_error() {
            error!(error = %err, "request failed upstream");
        } else {
            warn!(error = %err, code, "request rejected");
        }
        AppError::new(status, code, err.to_string())
    }
}
