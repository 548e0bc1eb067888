//! # Intake Common Library
//!
//! Shared code for the submission intake service:
//! - Error type and result alias
//! - Configuration loading and resolution
//! - Category schemas and sheet row assembly

pub mod category;
pub mod config;
pub mod error;

pub use category::{AttachmentSlot, Category, CategorySchema};
pub use error::{Error, Result};
