//! Maps domain `AppError` to HTTP responses.
//!
//! Every credential and token failure collapses into one 401 body so a
//! caller cannot tell an unknown email from a wrong password or an expired
//! token from a revoked session. The precise kind is logged instead.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use gatehouse_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Handler error type; wraps [`AppError`] so it can become a response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

/// Status and public error code for a kind.
pub fn status_for(kind: ErrorKind) -> (StatusCode, &'static str) {
    if kind.is_authentication_failure() {
        return (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED");
    }
    match kind {
        ErrorKind::Unauthorized => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        ErrorKind::AlreadyRegistered => (StatusCode::CONFLICT, "ALREADY_REGISTERED"),
        ErrorKind::AlreadyInvited => (StatusCode::CONFLICT, "ALREADY_INVITED"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::InvitationNotFound => (StatusCode::NOT_FOUND, "INVITATION_NOT_FOUND"),
        ErrorKind::Validation => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
        ErrorKind::RoleNotActive => (StatusCode::BAD_REQUEST, "ROLE_NOT_ACTIVE"),
        ErrorKind::PasswordMismatch => (StatusCode::BAD_REQUEST, "PASSWORD_MISMATCH"),
        ErrorKind::ExternalService => (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR"),
        ErrorKind::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, code) = status_for(err.kind);

        let message = if status == StatusCode::UNAUTHORIZED {
            debug!(kind = %err.kind, "Authentication failed");
            "Authentication failed".to_string()
        } else if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(kind = %err.kind, error = %err, source = ?err.source, "Request failed");
            match err.kind {
                ErrorKind::ExternalService => "Upstream service unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            if status == StatusCode::FORBIDDEN {
                warn!(error = %err.message, "Forbidden");
            }
            err.message
        };

        let body = ApiErrorResponse {
            error: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
