//! form-cleaner - pre-processing for scanned forms
//!
//! CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use form_cleaner::{
    exit_codes, init_tracing, BatchProcessor, BatchReport, CleanArgs, Cli, Commands, Config,
    FileOutcome, FileStatus, FormFormat, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;
use tracing::warn;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Clean(args) => run_clean(&args),
        Commands::Info => run_info().map(|()| exit_codes::SUCCESS),
    };

    std::process::exit(match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_codes::GENERAL_ERROR
        }
    });
}

// ============ Progress Callback Implementation ============

/// Progress bar on stderr
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(total: usize, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} forms {msg}",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for BarProgress {
    fn on_file_start(&self, file: &Path) {
        if let Some(name) = file.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
    }

    fn on_file_complete(&self, _outcome: &FileOutcome) {
        self.bar.inc(1);
    }
}

// ============ Clean Command ============

fn run_clean(args: &CleanArgs) -> Result<i32> {
    init_tracing(args.verbose, args.quiet);
    let start_time = Instant::now();

    if !args.input.exists() {
        eprintln!("Error: Input path does not exist: {}", args.input.display());
        return Ok(exit_codes::INPUT_NOT_FOUND);
    }

    // Explicit config file must load; the default locations may be absent
    let file_config = match &args.config {
        Some(path) => match Config::load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: Failed to load config file: {}", e);
                return Ok(exit_codes::INVALID_ARGS);
            }
        },
        None => Config::load().unwrap_or_else(|e| {
            warn!("ignoring config file: {}", e);
            Config::default()
        }),
    };

    let config = file_config.merge_with_cli(&args.overrides());
    let processor = BatchProcessor::new(config);

    let files = processor
        .collect(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    if files.is_empty() {
        eprintln!("Error: No form files found in {}", args.input.display());
        return Ok(exit_codes::INPUT_NOT_FOUND);
    }

    let progress = BarProgress::new(files.len(), !args.quiet && !args.json);
    let report = processor.run(&args.input, &files, &progress);
    progress.finish();

    if args.json {
        println!("{}", report.to_json()?);
    } else if !args.quiet {
        print_summary(&report, &processor.config().output_dir);
        println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    Ok(if report.has_failures() {
        exit_codes::GENERAL_ERROR
    } else {
        exit_codes::SUCCESS
    })
}

fn print_summary(report: &BatchReport, output_dir: &Path) {
    println!("=== Summary ===");
    println!("Forms:   {}", report.total);
    println!("Cleaned: {}", report.cleaned);
    println!("Skipped: {}", report.skipped);
    println!("Failed:  {}", report.failed);
    println!("Output:  {}", output_dir.display());

    let problems: Vec<&FileOutcome> = report
        .files
        .iter()
        .filter(|f| f.status != FileStatus::Cleaned)
        .collect();
    if !problems.is_empty() {
        println!();
        for outcome in problems {
            let label = match outcome.status {
                FileStatus::Skipped => "skipped",
                _ => "failed",
            };
            println!(
                "  {} {}: {}",
                label,
                outcome.input.display(),
                outcome.reason.as_deref().unwrap_or("")
            );
        }
    }
}

// ============ Info Command ============

fn run_info() -> Result<()> {
    println!("form-cleaner v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Supported Formats:");
    for format in FormFormat::SUPPORTED {
        println!("  {} (.{})", format.mime(), format.extension());
    }
    println!();
    println!("Requires Conversion (not implemented):");
    for format in FormFormat::SUPPORTED_AFTER_CONVERSION {
        println!("  {} (.{})", format.mime(), format.extension());
    }

    println!();
    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    println!();
    println!("Config File Locations:");
    println!("  Local: ./{}", form_cleaner::config::LOCAL_CONFIG_FILE);
    if let Some(path) = Config::user_config_path() {
        println!("  User:  {}", path.display());
    }

    Ok(())
}
