//! Google Drive and Google Sheets clients
//!
//! Both clients share one service-account [`TokenProvider`] and one
//! `reqwest::Client`, built once at startup.

pub mod auth;
pub mod drive;
pub mod sheets;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use drive::DriveClient;
pub use sheets::SheetsClient;

use thiserror::Error;

/// OAuth scopes requested for the service account
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/spreadsheets",
];

pub const USER_AGENT: &str = concat!("intake-server/", env!("CARGO_PKG_VERSION"));

/// Google client errors
#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("{service} API error {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GoogleError {
    fn from(err: reqwest::Error) -> Self {
        GoogleError::Network(err.to_string())
    }
}

impl From<GoogleError> for intake_common::Error {
    fn from(err: GoogleError) -> Self {
        intake_common::Error::Upstream(err.to_string())
    }
}

/// Pass successful responses through; turn others into [`GoogleError::Api`].
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GoogleError::Api {
        service,
        status: status.as_u16(),
        body,
    })
}
