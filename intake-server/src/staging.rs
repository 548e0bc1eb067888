//! Local staging of uploaded files
//!
//! Each file part is written under a random name in the staging directory
//! until it has been transferred to storage. The declared filename is only
//! metadata for the upload.

use intake_common::{AttachmentSlot, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Mime type assumed when a file part declares none
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Directory holding staged uploads
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Use `dir` for staging, creating it if missing
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty staged file and return it with a writable handle.
    ///
    /// Callers report written bytes through [`StagedFile::record_written`].
    pub async fn open(
        &self,
        slot: AttachmentSlot,
        file_name: &str,
        mime_type: &str,
    ) -> Result<(StagedFile, tokio::fs::File)> {
        let path = self.dir.join(format!("{}.upload", Uuid::new_v4()));
        let handle = tokio::fs::File::create(&path).await?;
        let staged = StagedFile {
            slot,
            path,
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            size: 0,
            removed: false,
        };
        Ok((staged, handle))
    }
}

/// A file waiting in the staging area
///
/// Dropping a staged file that was not explicitly removed deletes it.
#[derive(Debug)]
pub struct StagedFile {
    slot: AttachmentSlot,
    path: PathBuf,
    file_name: String,
    mime_type: String,
    size: u64,
    removed: bool,
}

impl StagedFile {
    pub fn slot(&self) -> AttachmentSlot {
        self.slot
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filename declared by the client
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn record_written(&mut self, bytes: usize) {
        self.size += bytes as u64;
    }

    /// Open the staged copy for reading
    pub async fn reader(&self) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::open(&self.path).await
    }

    /// Delete the staged copy
    pub async fn remove(mut self) -> std::io::Result<()> {
        let result = tokio::fs::remove_file(&self.path).await;
        self.removed = result.is_ok();
        result
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Discarded staged file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Failed to discard staged file {}: {}", self.path.display(), e),
        }
    }
}
