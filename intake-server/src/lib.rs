//! intake-server library
//!
//! HTTP intake for form submissions: stages attached files, uploads them to
//! Google Drive, and appends the form data as one row of a Google Sheet.

pub mod api;
pub mod error;
pub mod form;
pub mod google;
pub mod services;
pub mod staging;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use intake_common::config::DEFAULT_MAX_UPLOAD_BYTES;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::services::{FileStore, SheetStore, SubmissionProcessor};
use crate::staging::StagingArea;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Submission orchestration over the storage and spreadsheet collaborators
    pub processor: SubmissionProcessor,
    /// Local directory for uploads awaiting transfer
    pub staging: StagingArea,
    /// CORS origins; empty or `*` allows any
    pub allowed_origins: Vec<String>,
    /// Request body limit in bytes
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        files: Arc<dyn FileStore>,
        sheets: Arc<dyn SheetStore>,
        staging: StagingArea,
    ) -> Self {
        Self {
            processor: SubmissionProcessor::new(files, sheets),
            staging,
            allowed_origins: Vec::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            startup_time: Utc::now(),
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);
    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::submit_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 500 body for a handler that panicked
fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(detail).into_response()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
