//! Submission orchestration
//!
//! Order per request: email check, uploads, row assembly, append. Every
//! attached file is uploaded; the row links only the slots its tab has a
//! column for. Nothing is rolled back: a file uploaded before a failed
//! append stays in storage.

use intake_common::category::{confirmation_for, normalize_email, sanitize_row};
use intake_common::{AttachmentSlot, Category, CategorySchema, Error};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{EmailLocks, FileStore, SheetStore};
use crate::error::ApiError;
use crate::form::Submission;
use crate::staging::StagedFile;

/// Why a submission was not appended
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("email is required for {0} submissions")]
    MissingEmail(Category),

    #[error("A submission with this email already exists")]
    DuplicateEmail,

    #[error("Email lookup failed: {0}")]
    Lookup(#[source] Error),

    #[error("Upload of {slot} failed: {source}")]
    Upload { slot: AttachmentSlot, source: Error },

    #[error("Append to {sheet} failed: {source}")]
    Append { sheet: String, source: Error },
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::MissingEmail(_) => ApiError::BadRequest(err.to_string()),
            SubmitError::DuplicateEmail => ApiError::DuplicateEmail(err.to_string()),
            SubmitError::Lookup(_) | SubmitError::Upload { .. } | SubmitError::Append { .. } => {
                ApiError::Upstream(err.to_string())
            }
        }
    }
}

/// Outcome of an appended submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub category: Option<Category>,
    pub message: &'static str,
    /// Files transferred to storage
    pub uploaded: usize,
    /// Cells in the appended row
    pub columns: usize,
}

/// Runs submissions against the storage and spreadsheet collaborators
#[derive(Clone)]
pub struct SubmissionProcessor {
    files: Arc<dyn FileStore>,
    sheets: Arc<dyn SheetStore>,
    locks: EmailLocks,
}

impl SubmissionProcessor {
    pub fn new(files: Arc<dyn FileStore>, sheets: Arc<dyn SheetStore>) -> Self {
        Self {
            files,
            sheets,
            locks: EmailLocks::new(),
        }
    }

    pub async fn process(&self, submission: Submission) -> Result<SubmissionReceipt, SubmitError> {
        let category = submission.category();
        let email = submission.email().map(str::to_string);
        let Submission {
            sheet_name,
            values,
            attachments,
        } = submission;
        let values: Vec<Option<String>> = values.into_iter().map(|v| v.value).collect();

        // Held through the append
        let _lock = match category {
            Some(category) => {
                let schema = category.schema();
                let email = email.ok_or(SubmitError::MissingEmail(category))?;
                let lock = self.locks.acquire(&sheet_name, &email).await;
                self.ensure_new_email(schema, &email).await?;
                Some(lock)
            }
            None => None,
        };

        let links = self.upload_attachments(attachments).await?;
        let uploaded = links.len();

        let row = match category {
            Some(category) => {
                let schema = category.schema();
                let unplaced: Vec<String> = links
                    .keys()
                    .filter(|slot| !schema.uses_slot(**slot))
                    .map(|slot| slot.to_string())
                    .collect();
                if !unplaced.is_empty() {
                    warn!(
                        sheet = %sheet_name,
                        "Uploaded files the tab has no column for: {}",
                        unplaced.join(", ")
                    );
                }
                schema.assemble_row(values, &links)
            }
            None => {
                debug!("No schema for tab '{}', appending fields as received", sheet_name);
                if uploaded > 0 {
                    warn!(
                        sheet = %sheet_name,
                        uploaded,
                        "Uploaded files are not linked from the row"
                    );
                }
                sanitize_row(values)
            }
        };

        let columns = row.len();
        self.sheets
            .append(&sheet_name, row)
            .await
            .map_err(|source| SubmitError::Append {
                sheet: sheet_name.clone(),
                source,
            })?;

        Ok(SubmissionReceipt {
            category,
            message: confirmation_for(category),
            uploaded,
            columns,
        })
    }

    async fn ensure_new_email(
        &self,
        schema: &CategorySchema,
        email: &str,
    ) -> Result<(), SubmitError> {
        let range = schema.email_range();
        let rows = self.sheets.get(&range).await.map_err(SubmitError::Lookup)?;

        let wanted = normalize_email(email);
        let exists = rows
            .iter()
            .flatten()
            .any(|cell| normalize_email(cell) == wanted);

        if exists {
            info!(sheet = %schema.category, range = %range, "Email already recorded");
            return Err(SubmitError::DuplicateEmail);
        }
        Ok(())
    }

    /// Upload every staged file, in slot order.
    ///
    /// Removes each staged copy after its upload succeeds. Files not yet
    /// uploaded when one fails are discarded on drop.
    async fn upload_attachments(
        &self,
        mut attachments: HashMap<AttachmentSlot, StagedFile>,
    ) -> Result<HashMap<AttachmentSlot, String>, SubmitError> {
        let mut links = HashMap::new();

        for slot in AttachmentSlot::ALL {
            let Some(file) = attachments.remove(&slot) else {
                continue;
            };

            let link = self
                .files
                .upload(&file)
                .await
                .map_err(|source| SubmitError::Upload { slot, source })?;
            info!(slot = %slot, file_name = %file.file_name(), "Uploaded attachment");

            let path = file.path().to_path_buf();
            if let Err(e) = file.remove().await {
                warn!("Failed to remove staged file {}: {}", path.display(), e);
            }
            links.insert(slot, link);
        }

        Ok(links)
    }
}
