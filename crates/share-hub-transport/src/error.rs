//! API error types and HTTP response conversion.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use share_hub_session::ShareError;
use thiserror::Error;

/// Error body returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Code for programmatic handling.
    pub code: String,
}

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error of an HTTP operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request: missing field, bad JSON, missing upgrade.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request well-formed but outside what the share accepts.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Secret did not match.
    #[error("Unauthorized")]
    Unauthorized,

    /// The share actor stopped while handling the request.
    #[error("Service unavailable")]
    Unavailable,

    /// Storage or other server-side failure.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code identifier.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Error type name.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BadRequest",
            Self::Validation(_) => "ValidationError",
            Self::Unauthorized => "AuthorizationError",
            Self::Unavailable => "Unavailable",
            Self::Internal(_) => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let body = ApiErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
            code: code.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(code, "request failed: {}", body.message);
        } else {
            tracing::warn!(code, "request rejected: {}", body.message);
        }

        (status, Json(body)).into_response()
    }
}

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::Unauthorized => Self::Unauthorized,
            ShareError::InvalidKey { .. } | ShareError::InvalidSessionId => {
                Self::Validation(err.to_string())
            }
            ShareError::Storage(e) => Self::Internal(e.to_string()),
            ShareError::ActorUnavailable => Self::Unavailable,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
