//! CLI argument parsing and configuration

use crate::types::{Device, OutputFormat};
use clap::Parser;
use std::path::PathBuf;

/// demucs-cli - A friendly batch front-end for Demucs
///
/// Separates audio files into drums, bass, other and vocals stems by running
/// Demucs inside a conda environment, then mixes an instrumental track with ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "demucs-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Audio files or directories to process
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Output directory for separated stems
    #[arg(short, long, value_name = "DIR", default_value = "./output")]
    pub output: PathBuf,

    /// Compute device
    #[arg(short, long, value_enum, default_value_t = Device::Cpu)]
    pub device: Device,

    /// Number of files processed at the same time
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: u32,

    /// Demucs model name
    #[arg(short, long, value_name = "NAME", default_value = "htdemucs")]
    pub model: String,

    /// Conda environment that has demucs installed
    #[arg(long = "env", value_name = "NAME", default_value = "demucs")]
    pub env_name: String,

    /// Stem output format (demucs writes wav when omitted)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// MP3 bitrate, e.g. 320 or 320k (only used with --format mp3)
    #[arg(long, value_name = "RATE")]
    pub mp3_bitrate: Option<String>,

    /// Conda executable
    #[arg(long, value_name = "PROGRAM", env = "DEMUCS_CLI_CONDA", default_value = "conda")]
    pub conda: String,

    /// Kill any external command that runs longer than this many seconds
    #[arg(long, value_name = "SECS", env = "DEMUCS_CLI_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Do not descend into subdirectories
    #[arg(long, default_value = "false")]
    pub no_recursive: bool,

    /// Write a JSON report of the batch to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress spinners)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Only check the environment, do not process anything
    #[arg(long, default_value = "false")]
    pub check: bool,

    /// Print the demucs commands that would run without running them
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
