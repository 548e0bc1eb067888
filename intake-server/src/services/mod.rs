//! Submission services and the collaborator seams they depend on

pub mod email_lock;
pub mod submission;

pub use email_lock::{EmailLockGuard, EmailLocks};
pub use submission::{SubmissionProcessor, SubmissionReceipt, SubmitError};

use async_trait::async_trait;
use intake_common::Result;

use crate::staging::StagedFile;

/// Cloud storage for submitted files
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Upload a staged file into the configured folder.
    ///
    /// Returns the file's view link. The staged copy is left in place; the
    /// caller removes it once the upload has succeeded.
    async fn upload(&self, file: &StagedFile) -> Result<String>;
}

/// Spreadsheet holding one tab per category
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Read the cells of an A1 range, row by row
    async fn get(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// Append one row to the named tab below its header
    async fn append(&self, sheet_name: &str, row: Vec<String>) -> Result<()>;
}
