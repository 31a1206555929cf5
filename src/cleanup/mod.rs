//! Cleanup module for scanned form images
//!
//! Normalizes a decoded form before it is sent to text recognition.
//!
//! # Features
//!
//! - **Grayscale** ([`grayscale`]) - BGR to single-channel luma conversion

pub mod grayscale;
mod types;

// Re-export public API
pub use grayscale::{bgr_to_luma, clean};

pub use types::{CleanupError, Result};
