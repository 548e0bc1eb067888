//! Submission request parsing
//!
//! `POST /submit` accepts multipart, JSON and URL-encoded bodies. All three
//! produce a [`Submission`]: the tab name, the remaining values in received
//! order, and (multipart only) the staged attachments by slot.

use axum::async_trait;
use axum::extract::multipart::MultipartError;
use axum::extract::{Form, FromRequest, Multipart, Request};
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::Json;
use intake_common::category::{EMAIL_FIELD, SHEET_NAME_FIELD};
use intake_common::{AttachmentSlot, Category};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::staging::{StagedFile, StagingArea, DEFAULT_MIME_TYPE};
use crate::AppState;

/// One submitted value; `None` is a JSON `null`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormValue {
    pub name: String,
    pub value: Option<String>,
}

/// A parsed submission
#[derive(Debug)]
pub struct Submission {
    /// Destination tab
    pub sheet_name: String,
    /// Values in received order, without `sheetName`
    pub values: Vec<FormValue>,
    pub attachments: HashMap<AttachmentSlot, StagedFile>,
}

impl Submission {
    pub fn category(&self) -> Option<Category> {
        Category::from_sheet_name(&self.sheet_name)
    }

    /// First non-blank `email` value
    pub fn email(&self) -> Option<&str> {
        self.values
            .iter()
            .filter(|v| v.name == EMAIL_FIELD)
            .filter_map(|v| v.value.as_deref())
            .find(|v| !v.trim().is_empty())
    }
}

#[derive(Default)]
struct SubmissionBuilder {
    sheet_name: Option<String>,
    values: Vec<FormValue>,
    attachments: HashMap<AttachmentSlot, StagedFile>,
}

impl SubmissionBuilder {
    fn push(&mut self, name: String, value: Option<String>) {
        if name == SHEET_NAME_FIELD {
            if self.sheet_name.is_none() {
                self.sheet_name = value;
            } else {
                warn!("Ignoring repeated {} field", SHEET_NAME_FIELD);
            }
            return;
        }
        self.values.push(FormValue { name, value });
    }

    fn attach(&mut self, staged: StagedFile) {
        let slot = staged.slot();
        if self.attachments.contains_key(&slot) {
            warn!("Ignoring additional file for slot {}", slot);
            return;
        }
        self.attachments.insert(slot, staged);
    }

    fn finish(self) -> Result<Submission, ApiError> {
        let sheet_name = self
            .sheet_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("{} is required", SHEET_NAME_FIELD)))?;

        Ok(Submission {
            sheet_name,
            values: self.values,
            attachments: self.attachments,
        })
    }
}

#[async_trait]
impl FromRequest<AppState> for Submission {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| rejection_error(e.status(), e.body_text()))?;
            from_multipart(multipart, &state.staging).await
        } else if content_type.starts_with("application/json") {
            let Json(map) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| rejection_error(e.status(), e.body_text()))?;
            from_json(map)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| rejection_error(e.status(), e.body_text()))?;
            from_pairs(pairs)
        } else {
            Err(ApiError::UnsupportedMediaType(format!(
                "Unsupported content type '{}'",
                content_type
            )))
        }
    }
}

/// Read every part; file parts stream to the staging area as they arrive.
pub async fn from_multipart(
    mut multipart: Multipart,
    staging: &StagingArea,
) -> Result<Submission, ApiError> {
    let mut builder = SubmissionBuilder::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let text = field.text().await.map_err(multipart_error)?;
            builder.push(name, Some(text));
            continue;
        };

        let slot = AttachmentSlot::from_field_name(&name)
            .ok_or_else(|| ApiError::BadRequest(format!("Unexpected file field '{}'", name)))?;
        let mime_type = field.content_type().unwrap_or(DEFAULT_MIME_TYPE).to_string();

        let (mut staged, mut handle) = staging.open(slot, &file_name, &mime_type).await?;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            handle.write_all(&chunk).await?;
            staged.record_written(chunk.len());
        }
        handle.flush().await?;
        drop(handle);

        // Browsers send an empty, unnamed part for a file input left blank
        if file_name.is_empty() && staged.is_empty() {
            debug!("Slot {} submitted without a file", slot);
            continue;
        }

        debug!(
            slot = %slot,
            file_name = %staged.file_name(),
            bytes = staged.size(),
            "Staged upload"
        );
        builder.attach(staged);
    }

    builder.finish()
}

pub fn from_json(map: Map<String, Value>) -> Result<Submission, ApiError> {
    let mut builder = SubmissionBuilder::default();
    for (name, value) in map {
        builder.push(name, json_text(value));
    }
    builder.finish()
}

pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Submission, ApiError> {
    let mut builder = SubmissionBuilder::default();
    for (name, value) in pairs {
        builder.push(name, Some(value));
    }
    builder.finish()
}

/// Strings verbatim, `null` as `None`, anything else as its JSON text
fn json_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    rejection_error(err.status(), err.body_text())
}

/// Over-limit bodies stay 413; every other body failure is the client's
fn rejection_error(status: StatusCode, detail: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(detail)
    } else {
        ApiError::BadRequest(detail)
    }
}
