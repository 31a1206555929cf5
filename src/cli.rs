//! Command-line interface definitions

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CliOverrides;

#[derive(Parser, Debug)]
#[command(
    name = "form-cleaner",
    author,
    version,
    about = "Clean scanned forms before text recognition"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert forms to grayscale and write them back in their original format
    Clean(CleanArgs),
    /// Show version, supported formats and config file locations
    Info,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Form file or directory of forms
    pub input: PathBuf,

    /// Output directory [default: input-cleaned]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Leave forms whose output already exists untouched
    #[arg(long)]
    pub skip_existing: bool,

    /// Quality for re-encoded JPEG forms (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: Option<u8>,

    /// Worker threads [default: one per CPU]
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl CleanArgs {
    /// Settings given on the command line.
    ///
    /// Boolean flags only override the config file when they are set.
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            output_dir: self.output.clone(),
            jpeg_quality: self.jpeg_quality,
            recursive: self.recursive.then_some(true),
            skip_existing: self.skip_existing.then_some(true),
            threads: self.threads,
        }
    }
}
