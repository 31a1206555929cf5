//! form-cleaner - pre-processing for scanned forms
//!
//! Prepares scanned forms for text recognition: the file type is detected
//! from its contents, the image is decoded to a BGR raster, converted to
//! single-channel grayscale and written back in the format it came in.
//!
//! # Modules
//!
//! - [`raster`] - decoded image buffers
//! - [`cleanup`] - the grayscale conversion itself
//! - [`preprocess`] - decode, clean and re-encode a single form
//! - [`batch`] - run the stage over files and directories
//! - [`config`] - TOML configuration
//!
//! # Example
//!
//! ```
//! use form_cleaner::{clean, Raster};
//!
//! let red = Raster::from_pixel(2, 2, &[0, 0, 255]).unwrap();
//! let gray = clean(&red).unwrap();
//! assert_eq!(gray.channels(), 1);
//! assert_eq!(gray.data(), &[76, 76, 76, 76]);
//! ```

pub mod batch;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod logging;
pub mod preprocess;
pub mod raster;

pub use batch::{
    collect_form_files, BatchProcessor, BatchReport, FileOutcome, FileStatus, NoProgress,
    ProgressCallback,
};
pub use cleanup::{clean, CleanupError};
pub use cli::{CleanArgs, Cli, Commands};
pub use config::{CliOverrides, Config, ConfigError};
pub use logging::init_tracing;
pub use preprocess::{
    CleanedForm, FormFormat, FormPreprocessor, PreprocessError, PreprocessOptions,
};
pub use raster::Raster;

/// Process exit codes
pub mod exit_codes {
    /// Every form was cleaned or skipped
    pub const SUCCESS: i32 = 0;

    /// At least one form failed, or an unexpected error occurred
    pub const GENERAL_ERROR: i32 = 1;

    /// Bad arguments or config file
    pub const INVALID_ARGS: i32 = 2;

    /// Input path missing or holds no forms
    pub const INPUT_NOT_FOUND: i32 = 3;
}
