//! Common types for the preprocess module

use std::path::PathBuf;
use thiserror::Error;

use crate::cleanup::CleanupError;

/// Preprocess error types
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Form not found: {0}")]
    FormNotFound(PathBuf),

    #[error("Empty input")]
    EmptyInput,

    #[error("Unrecognized file type")]
    UnrecognizedFormat,

    #[error("Unsupported MIME type: {0}")]
    UnsupportedFormat(String),

    #[error("MIME type {0} must be converted to an image first")]
    ConversionRequired(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Cleanup failed: {0}")]
    Cleanup(#[from] CleanupError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PreprocessError {
    /// True for inputs that are not forms this stage handles, as opposed to
    /// forms that failed while being processed.
    pub fn is_unsupported_input(&self) -> bool {
        matches!(
            self,
            PreprocessError::UnrecognizedFormat
                | PreprocessError::UnsupportedFormat(_)
                | PreprocessError::ConversionRequired(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PreprocessError>;
