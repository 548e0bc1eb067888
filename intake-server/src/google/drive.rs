//! Google Drive uploads
//!
//! Uses the resumable protocol: one request opens an upload session with the
//! file metadata, a second sends the bytes to the session URL.

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{check_status, GoogleError, TokenProvider};
use crate::services::FileStore;
use crate::staging::StagedFile;

const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

#[derive(Debug, Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
}

/// Subset of the Drive `File` resource requested via `fields`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

/// Uploads into one Drive folder
pub struct DriveClient {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    folder_id: String,
    upload_url: String,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, auth: Arc<TokenProvider>, folder_id: String) -> Self {
        Self {
            http,
            auth,
            folder_id,
            upload_url: DRIVE_UPLOAD_URL.to_string(),
        }
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    /// Upload `body` of `len` bytes as a new file in the folder
    pub async fn upload_file(
        &self,
        name: &str,
        mime_type: &str,
        body: reqwest::Body,
        len: u64,
    ) -> Result<DriveFile, GoogleError> {
        let token = self.auth.access_token().await?;
        let metadata = FileMetadata {
            name,
            parents: [self.folder_id.as_str()],
        };

        let response = self
            .http
            .post(&self.upload_url)
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "resumable"),
                ("fields", "id,webViewLink"),
                ("supportsAllDrives", "true"),
            ])
            .header("X-Upload-Content-Type", mime_type)
            .header("X-Upload-Content-Length", len.to_string())
            .json(&metadata)
            .send()
            .await?;
        let response = check_status("Drive", response).await?;

        let session_url = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                GoogleError::Parse("Drive returned no upload session location".to_string())
            })?
            .to_string();
        debug!(name = %name, bytes = len, "Drive upload session opened");

        let response = self
            .http
            .put(&session_url)
            .bearer_auth(&token)
            .header(CONTENT_TYPE, mime_type)
            .header(CONTENT_LENGTH, len)
            .body(body)
            .send()
            .await?;
        let response = check_status("Drive", response).await?;

        response
            .json::<DriveFile>()
            .await
            .map_err(|e| GoogleError::Parse(e.to_string()))
    }
}

#[async_trait]
impl FileStore for DriveClient {
    async fn upload(&self, file: &StagedFile) -> intake_common::Result<String> {
        // Streamed from disk, never buffered whole
        let body = reqwest::Body::from(file.reader().await?);
        let uploaded = self
            .upload_file(file.file_name(), file.mime_type(), body, file.size())
            .await?;

        debug!(file_id = %uploaded.id, "Drive upload complete");
        uploaded.web_view_link.ok_or_else(|| {
            intake_common::Error::Upstream(format!(
                "Drive returned no view link for file {}",
                uploaded.id
            ))
        })
    }
}
