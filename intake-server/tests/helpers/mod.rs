//! Shared test fixtures: in-memory collaborators and request builders

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use intake_common::{Category, Error, Result};
use intake_server::services::{FileStore, SheetStore};
use intake_server::staging::{StagedFile, StagingArea};
use intake_server::{build_router, AppState};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

/// A file seen by [`FakeFileStore`]
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub slot: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Records uploads; answers `https://files.test/<name>`
#[derive(Default)]
pub struct FakeFileStore {
    pub uploads: Mutex<Vec<UploadedFile>>,
    pub fail: bool,
}

impl FakeFileStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn uploads(&self) -> Vec<UploadedFile> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileStore for FakeFileStore {
    async fn upload(&self, file: &StagedFile) -> Result<String> {
        if self.fail {
            return Err(Error::Upstream("storage unavailable".to_string()));
        }
        let bytes = tokio::fs::read(file.path()).await?;
        self.uploads.lock().unwrap().push(UploadedFile {
            slot: file.slot().to_string(),
            file_name: file.file_name().to_string(),
            mime_type: file.mime_type().to_string(),
            bytes,
        });
        Ok(format!("https://files.test/{}", file.file_name()))
    }
}

/// In-memory spreadsheet keyed by A1 range
#[derive(Default)]
pub struct FakeSheetStore {
    pub ranges: Mutex<HashMap<String, Vec<Vec<String>>>>,
    pub reads: Mutex<Vec<String>>,
    pub appended: Mutex<Vec<(String, Vec<String>)>>,
    pub fail_get: bool,
    pub fail_append: bool,
}

impl FakeSheetStore {
    pub fn with_range(range: &str, rows: Vec<Vec<&str>>) -> Self {
        let store = Self::default();
        store.ranges.lock().unwrap().insert(
            range.to_string(),
            rows.into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        );
        store
    }

    pub fn appended(&self) -> Vec<(String, Vec<String>)> {
        self.appended.lock().unwrap().clone()
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetStore for FakeSheetStore {
    async fn get(&self, range: &str) -> Result<Vec<Vec<String>>> {
        // Let concurrent submissions interleave here
        tokio::task::yield_now().await;
        self.reads.lock().unwrap().push(range.to_string());
        if self.fail_get {
            return Err(Error::Upstream("sheet read failed".to_string()));
        }
        Ok(self
            .ranges
            .lock()
            .unwrap()
            .get(range)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, sheet_name: &str, row: Vec<String>) -> Result<()> {
        if self.fail_append {
            return Err(Error::Upstream("sheet append failed".to_string()));
        }
        record_email(&self.ranges, sheet_name, &row);
        self.appended
            .lock()
            .unwrap()
            .push((sheet_name.to_string(), row));
        Ok(())
    }
}

/// Make an appended row visible to later email lookups, as the live sheet does
fn record_email(
    ranges: &Mutex<HashMap<String, Vec<Vec<String>>>>,
    sheet_name: &str,
    row: &[String],
) {
    let Some(category) = Category::from_sheet_name(sheet_name) else {
        return;
    };
    let schema = category.schema();
    let column = usize::from(schema.email_column.as_bytes()[0] - b'A');
    if let Some(email) = row.get(column) {
        ranges
            .lock()
            .unwrap()
            .entry(schema.email_range())
            .or_default()
            .push(vec![email.clone()]);
    }
}

/// Router wired to fakes, plus handles to inspect them
pub struct TestApp {
    pub router: Router,
    pub files: Arc<FakeFileStore>,
    pub sheets: Arc<FakeSheetStore>,
    pub staging_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(FakeFileStore::default(), FakeSheetStore::default()).await
    }

    pub async fn with(files: FakeFileStore, sheets: FakeSheetStore) -> Self {
        let staging_dir = TempDir::new().unwrap();
        let staging = StagingArea::create(staging_dir.path()).await.unwrap();
        let files = Arc::new(files);
        let sheets = Arc::new(sheets);
        let state = AppState::new(files.clone(), sheets.clone(), staging);

        Self {
            router: build_router(state),
            files,
            sheets,
            staging_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub fn staged_files(&self) -> usize {
        count_files(self.staging_dir.path())
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0)
}

const BOUNDARY: &str = "----intake-test-boundary";

/// Hand-built `multipart/form-data` body
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn texts(self, fields: &[(&str, &str)]) -> Self {
        fields
            .iter()
            .fold(self, |body, (name, value)| body.text(name, value))
    }

    pub fn file(mut self, name: &str, file_name: &str, mime_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {mime_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/submit")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub fn json_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/submit")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/submit")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Fourteen Papers fields; `email` is the third, matching column C
pub fn paper_fields(email: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = vec![
        ("firstName".into(), "Ada".into()),
        ("lastName".into(), "Lovelace".into()),
        ("email".into(), email.into()),
    ];
    for i in 3..14 {
        fields.push((format!("field{i}"), format!("value{i}")));
    }
    fields
}

/// Nine Partners fields; `email` lands in column I once the logo is spliced in
pub fn partner_fields(email: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = (0..7)
        .map(|i| (format!("field{i}"), format!("value{i}")))
        .collect();
    fields.push(("email".into(), email.into()));
    fields.push(("message".into(), "Happy to sponsor".into()));
    fields
}

pub fn as_refs(fields: &[(String, String)]) -> Vec<(&str, &str)> {
    fields
        .iter()
        .map(|(n, v)| (n.as_str(), v.as_str()))
        .collect()
}
