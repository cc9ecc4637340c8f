//! Runtime configuration settings

use crate::error::{DemucsCliError, Result};
use crate::types::{Device, OutputFormat};
use std::path::PathBuf;
use std::time::Duration;

/// Demucs' own default output directory when `-o` is not given
pub const DEFAULT_OUTPUT_DIR: &str = "separated";
/// Demucs' own default model when `-n` is not given
pub const DEFAULT_MODEL: &str = "htdemucs";
/// Conda environment used when none is named
pub const DEFAULT_ENV_NAME: &str = "demucs";

/// Options for separating files, built once per run and shared read-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Conda environment that runs demucs and ffmpeg
    pub env_name: String,
    pub device: Device,
    pub model: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    /// Bitrate for mp3 output, with or without a unit suffix ("320", "320k")
    pub mp3_bitrate: Option<String>,
    /// Files processed at once; also forwarded to demucs as `-j` when above 1
    pub concurrency: usize,
    pub verbose: bool,
    pub dry_run: bool,
}

impl ProcessOptions {
    /// Reject option combinations demucs cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(DemucsCliError::ConfigError(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.env_name.trim().is_empty() {
            return Err(DemucsCliError::ConfigError(
                "conda environment name must not be empty".to_string(),
            ));
        }
        if let Some(bitrate) = &self.mp3_bitrate {
            if normalize_bitrate(bitrate).is_none() {
                return Err(DemucsCliError::ConfigError(format!(
                    "invalid mp3 bitrate '{}', expected a number such as 320 or 320k",
                    bitrate
                )));
            }
        }
        Ok(())
    }

    /// Directory demucs writes into, falling back to its own default
    pub fn effective_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    /// Model demucs runs, falling back to its own default
    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Stem file format, wav unless another format was requested
    pub fn effective_format(&self) -> OutputFormat {
        self.format.unwrap_or(OutputFormat::Wav)
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            env_name: DEFAULT_ENV_NAME.to_string(),
            device: Device::Cpu,
            model: None,
            output_dir: None,
            format: None,
            mp3_bitrate: None,
            concurrency: 1,
            verbose: false,
            dry_run: false,
        }
    }
}

/// Strip the unit suffix from a bitrate; demucs only accepts the bare number.
///
/// Returns `None` when no leading digits remain.
pub fn normalize_bitrate(bitrate: &str) -> Option<String> {
    let digits: String = bitrate
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Runtime settings for a whole invocation
#[derive(Debug, Clone)]
pub struct Settings {
    /// Files or directories given on the command line
    pub inputs: Vec<PathBuf>,
    /// Options forwarded to every file
    pub process: ProcessOptions,
    /// Conda executable
    pub conda_program: String,
    /// Deadline for each external command, none when unset
    pub command_timeout: Option<Duration>,
    /// Scan directories recursively
    pub recursive: bool,
    /// Only run the environment check
    pub check_only: bool,
    /// Where to write the JSON report
    pub report_path: Option<PathBuf>,
    /// Show spinners
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Self {
        let process = ProcessOptions {
            env_name: cli.env_name.clone(),
            device: cli.device,
            model: Some(cli.model.clone()),
            output_dir: Some(cli.output.clone()),
            format: cli.format,
            mp3_bitrate: cli.mp3_bitrate.clone(),
            concurrency: cli.jobs as usize,
            verbose: cli.verbose > 0,
            dry_run: cli.dry_run,
        };

        Self {
            inputs: cli.inputs.clone(),
            process,
            conda_program: cli.conda.clone(),
            command_timeout: cli.timeout.map(Duration::from_secs),
            recursive: !cli.no_recursive,
            check_only: cli.check,
            report_path: cli.report.clone(),
            show_progress: !cli.quiet,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            process: ProcessOptions::default(),
            conda_program: "conda".to_string(),
            command_timeout: None,
            recursive: true,
            check_only: false,
            report_path: None,
            show_progress: true,
        }
    }
}
