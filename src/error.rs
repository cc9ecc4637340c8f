//! Unified error types for demucs-cli
//!
//! Error strategy:
//! - Per-file errors (spawn, invocation, timeout): captured into that file's
//!   result, the batch continues
//! - Run-level errors (environment not ready, no inputs, bad config): abort
//!   before any file is touched
//!
//! All errors include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

/// Input formats accepted by discovery, for helpful error messages
pub const SUPPORTED_FORMATS: &str = "mp3, wav, flac, m4a, aac, ogg, wma, aiff";

/// Top-level error type for demucs-cli operations
#[derive(Debug, Error)]
pub enum DemucsCliError {
    // =========================================================================
    // Per-file errors - recorded in the file result, batch continues
    // =========================================================================
    #[error("Failed to start '{program}': {source}\n  Tip: Check that '{program}' is installed and on your PATH")]
    SpawnFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {seconds}s and was killed")]
    Timeout { program: String, seconds: u64 },

    #[error("'{program}' exited with code {code}: {message}")]
    InvocationFailure {
        program: String,
        code: i32,
        message: String,
    },

    #[error("Merge input does not exist: '{0}'")]
    MergeInputMissing(PathBuf),

    // =========================================================================
    // Run-level errors - abort before processing
    // =========================================================================
    #[error("Environment is not ready: {reason}\n  Tip: Run with --check for a full report")]
    EnvironmentNotReady { reason: String },

    #[error("Path not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("No valid audio files found\n  Supported formats: {SUPPORTED_FORMATS}")]
    NoAudioFiles,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },
}

/// Result type alias for demucs-cli operations
pub type Result<T> = std::result::Result<T, DemucsCliError>;

impl DemucsCliError {
    /// Create a spawn failure for the given program
    pub fn spawn_failure(program: impl Into<String>, source: std::io::Error) -> Self {
        DemucsCliError::SpawnFailure {
            program: program.into(),
            source,
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        DemucsCliError::OutputError { path, reason }
    }
}
