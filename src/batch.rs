//! Batch processing of form files
//!
//! Collects forms from a file or directory and runs each one through the
//! [`FormPreprocessor`]. Files are independent: one failing never stops
//! the others, and each gets an entry in the [`BatchReport`].

use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::preprocess::{cleaned_path, FormFormat, FormPreprocessor};

// ============================================================
// Progress
// ============================================================

/// Per-file progress notifications.
///
/// Called from worker threads, so implementations must be `Sync`.
pub trait ProgressCallback: Sync {
    /// A file is about to be processed
    fn on_file_start(&self, _file: &Path) {}

    /// A file is done, whatever the outcome
    fn on_file_complete(&self, _outcome: &FileOutcome) {}
}

/// Progress callback that ignores everything
pub struct NoProgress;

impl ProgressCallback for NoProgress {}

// ============================================================
// Report
// ============================================================

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Cleaned,
    Skipped,
    Failed,
}

/// Result for a single input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FileOutcome {
    fn cleaned(input: &Path, output: PathBuf) -> Self {
        Self {
            input: input.to_path_buf(),
            status: FileStatus::Cleaned,
            output: Some(output),
            reason: None,
        }
    }

    fn skipped(input: &Path, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_path_buf(),
            status: FileStatus::Skipped,
            output: None,
            reason: Some(reason.into()),
        }
    }

    fn failed(input: &Path, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_path_buf(),
            status: FileStatus::Failed,
            output: None,
            reason: Some(reason.into()),
        }
    }
}

/// Summary of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub cleaned: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn from_outcomes(files: Vec<FileOutcome>) -> Self {
        let count = |status| files.iter().filter(|f| f.status == status).count();
        Self {
            total: files.len(),
            cleaned: count(FileStatus::Cleaned),
            skipped: count(FileStatus::Skipped),
            failed: count(FileStatus::Failed),
            files,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ============================================================
// File collection
// ============================================================

/// True if the extension belongs to a form format
pub fn has_form_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(FormFormat::from_extension)
        .is_some()
}

/// Collect form files from a file or directory.
///
/// A file path is returned as given; its type is checked later from its
/// contents. Directory entries are filtered by extension and sorted.
/// Symbolic links inside the directory are not followed.
pub fn collect_form_files(input: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input path does not exist: {}", input.display()),
        ));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(input).follow_links(false).max_depth(max_depth) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && has_form_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    Ok(files)
}

// ============================================================
// Processor
// ============================================================

/// Runs the pre-processing stage over many files
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    config: Config,
    preprocessor: FormPreprocessor,
}

impl BatchProcessor {
    pub fn new(config: Config) -> Self {
        let preprocessor = FormPreprocessor::new(config.preprocess_options());
        Self {
            config,
            preprocessor,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Collect input files.
    ///
    /// When the output directory lies below the input directory, files
    /// inside it are left out so a re-run does not clean its own results.
    pub fn collect(&self, input: &Path) -> io::Result<Vec<PathBuf>> {
        let resolve = |path: &Path| fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let files = collect_form_files(input, self.config.recursive)?;

        let input_root = resolve(input);
        let output_dir = resolve(&self.config.output_dir);
        if output_dir == input_root || !output_dir.starts_with(&input_root) {
            return Ok(files);
        }

        Ok(files
            .into_iter()
            .filter(|file| !resolve(file).starts_with(&output_dir))
            .collect())
    }

    /// Process `files`, which were collected below `input_root`
    pub fn run(
        &self,
        input_root: &Path,
        files: &[PathBuf],
        progress: &dyn ProgressCallback,
    ) -> BatchReport {
        let process = |file: &PathBuf| self.process_one(input_root, file, progress);

        let outcomes: Vec<FileOutcome> = match self.config.threads {
            Some(1) => files.iter().map(process).collect(),
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(|| files.par_iter().map(process).collect()),
                Err(e) => {
                    warn!("could not build a {}-thread pool, using the default: {}", threads, e);
                    files.par_iter().map(process).collect()
                }
            },
            None => files.par_iter().map(process).collect(),
        };

        let report = BatchReport::from_outcomes(outcomes);
        info!(
            total = report.total,
            cleaned = report.cleaned,
            skipped = report.skipped,
            failed = report.failed,
            "batch finished"
        );
        report
    }

    fn process_one(
        &self,
        input_root: &Path,
        file: &Path,
        progress: &dyn ProgressCallback,
    ) -> FileOutcome {
        progress.on_file_start(file);

        let output = cleaned_path(input_root, file, &self.config.output_dir);

        let outcome = if self.config.skip_existing && output.exists() {
            debug!(input = %file.display(), "output exists, skipping");
            FileOutcome::skipped(file, "output exists")
        } else {
            match self.preprocessor.process_file(file, &output) {
                Ok(cleaned) => {
                    debug!(
                        input = %file.display(),
                        output = %output.display(),
                        format = cleaned.format.mime(),
                        "cleaned"
                    );
                    FileOutcome::cleaned(file, output)
                }
                Err(e) if e.is_unsupported_input() => {
                    warn!(input = %file.display(), "skipping: {}", e);
                    FileOutcome::skipped(file, e.to_string())
                }
                Err(e) => {
                    error!(input = %file.display(), "cleaning failed: {}", e);
                    FileOutcome::failed(file, e.to_string())
                }
            }
        };

        progress.on_file_complete(&outcome);
        outcome
    }
}

// ============================================================
// Tests
// ============================================================
