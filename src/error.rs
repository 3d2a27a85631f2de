//! Error taxonomy shared by services, HTTP routes and websocket frames.
//!
//! DESIGN
//! ======
//! Every service error enum implements [`ErrorCode`] so callers can surface a
//! stable, grepable code plus a retry hint without matching on variants.
//! HTTP handlers convert service errors into [`ApiError`], which renders the
//! JSON body the dashboard expects: `{"detail", "code", "retryable"}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Stable machine-readable error metadata.
pub trait ErrorCode: std::error::Error {
    /// Grepable code such as `E_POST_NOT_FOUND`.
    fn error_code(&self) -> &'static str;

    /// Whether the caller may retry the same request unchanged.
    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// API ERROR
// =============================================================================

/// Error returned by route handlers.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ApiError {
    /// Build from a typed service error with an explicit status.
    #[must_use]
    pub fn from_code(status: StatusCode, err: &(impl ErrorCode + ?Sized)) -> Self {
        Self { status, code: err.error_code(), message: err.to_string(), retryable: err.retryable() }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, code: "E_NOT_FOUND", message: message.into(), retryable: false }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, code: "E_BAD_REQUEST", message: message.into(), retryable: false }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "E_UNAVAILABLE",
            message: message.into(),
            retryable: true,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, status = self.status.as_u16(), error = %self.message, "api: request failed");
        }
        let body = json!({
            "detail": self.message,
            "code": self.code,
            "retryable": self.retryable,
        });
        (self.status, Json(body)).into_response()
    }
}
