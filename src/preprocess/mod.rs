//! Preprocess module for incoming forms
//!
//! Bridges encoded files and the [`cleanup`](crate::cleanup) stage:
//!
//! - **Format** ([`format`]) - content-based file type detection
//! - **Form** ([`form`]) - decode, clean and re-encode in the original format

pub mod form;
pub mod format;
mod types;

// Re-export public API
pub use form::{
    cleaned_path, CleanedForm, FormPreprocessor, PreprocessOptions, DEFAULT_JPEG_QUALITY,
    DEFAULT_OUTPUT_DIR,
};

pub use format::{FormFormat, Sniffed};

pub use types::{PreprocessError, Result};
