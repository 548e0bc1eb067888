//! Form submission endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::form::Submission;
use crate::AppState;

/// Success body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /submit
///
/// Body is multipart, JSON or URL-encoded; see [`crate::form`].
pub async fn submit_form(
    State(state): State<AppState>,
    submission: Submission,
) -> ApiResult<Json<MessageResponse>> {
    let sheet = submission.sheet_name.clone();
    info!(
        sheet = %sheet,
        fields = submission.values.len(),
        attachments = submission.attachments.len(),
        "Submission received"
    );

    let receipt = state.processor.process(submission).await?;

    info!(
        sheet = %sheet,
        uploaded = receipt.uploaded,
        columns = receipt.columns,
        "Submission appended"
    );
    Ok(Json(MessageResponse {
        message: receipt.message.to_string(),
    }))
}

/// Build submission routes
pub fn submit_routes() -> Router<AppState> {
    Router::new().route("/submit", post(submit_form))
}
