//! Error types for intake-server
//!
//! Client errors answer `{"message"}`; server errors answer
//! `{"message": "Failed to submit form", "error": <detail>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Message carried by every server-side failure response
pub const FAILURE_MESSAGE: &str = "Failed to submit form";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Email already recorded for the category (400)
    #[error("{0}")]
    DuplicateEmail(String),

    /// Body encoding not accepted (415)
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// Body over the configured limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Storage or spreadsheet API failure (500)
    #[error("{0}")]
    Upstream(String),

    /// Unexpected failure, such as a handler panic (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// intake-common error
    #[error(transparent)]
    Common(#[from] intake_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::DuplicateEmail(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(_)
            | ApiError::Internal(_)
            | ApiError::Io(_)
            | ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        let body = if status.is_server_error() {
            error!(status = status.as_u16(), error = %detail, "Request failed");
            json!({
                "message": FAILURE_MESSAGE,
                "error": detail,
            })
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", detail);
            json!({ "message": detail })
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
