//! Common types for the cleanup module

use thiserror::Error;

/// Cleanup error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CleanupError {
    /// The raster does not have the shape the conversion expects
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CleanupError>;
