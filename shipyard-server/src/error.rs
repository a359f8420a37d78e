//! API error type
//!
//! Every handler returns [`ApiResult`]. Errors render as
//! `{"error": {"code": "...", "message": "..."}}` with the matching status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::integrations::IntegrationError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Well-formed request that breaks a domain rule (422)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Conflicts with current state (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource existed but is no longer usable (410)
    #[error("Gone: {0}")]
    Gone(String),

    /// Third-party service failed (502)
    #[error("Integration error: {0}")]
    Integration(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Gone(_) => (StatusCode::GONE, "GONE"),
            ApiError::Integration(_) => (StatusCode::BAD_GATEWAY, "INTEGRATION_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();

        let message = match self {
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Internal error while handling request");
                "Internal server error".to_string()
            }
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::Gone(msg)
            | ApiError::Integration(msg) => msg,
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<shipyard_common::Error> for ApiError {
    fn from(err: shipyard_common::Error) -> Self {
        use shipyard_common::Error as E;

        if err.is_unique_violation() {
            return ApiError::Conflict("A record with the same unique key already exists".into());
        }
        match err {
            E::NotFound(msg) => ApiError::NotFound(msg),
            E::InvalidInput(msg) => ApiError::Validation(msg),
            E::Conflict(msg) => ApiError::Conflict(msg),
            E::Database(sqlx::Error::RowNotFound) => ApiError::NotFound("Record not found".into()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        shipyard_common::Error::Database(err).into()
    }
}

impl From<IntegrationError> for ApiError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::Validation(msg) => ApiError::Validation(msg),
            other => ApiError::Integration(other.to_string()),
        }
    }
}

/// Result type for API handlers and services
pub type ApiResult<T> = Result<T, ApiError>;
