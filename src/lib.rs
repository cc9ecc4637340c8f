//! demucs-cli - Batch stem separation through a conda-hosted Demucs
//!
//! A command-line front-end that checks a conda environment, then runs
//! Demucs over many audio files and mixes an instrumental track from the
//! resulting stems with ffmpeg.
//!
//! # Architecture
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: Expanding input paths into audio files
//! - `exec`: Spawning external commands inside a conda environment
//! - `probe`: Checking conda, the environment, demucs, python libraries and ffmpeg
//! - `stems`: Locating stems and mixing the instrumental track
//! - `pipeline`: Single-file processing and batch orchestration
//! - `export`: JSON batch report
//! - `report`: Console rendering
//!
//! # Example
//!
//! ```no_run
//! use demucs_cli::{check_environment, config::ProcessOptions, process_audio_files_with_progress};
//! use std::path::PathBuf;
//!
//! # async fn run() {
//! let status = check_environment("demucs").await;
//! if status.overall_success {
//!     let files = vec![PathBuf::from("song.mp3")];
//!     let batch = process_audio_files_with_progress(&files, &ProcessOptions::default()).await;
//!     println!("{}/{} succeeded", batch.succeeded(), batch.results.len());
//! }
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod exec;
pub mod export;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod stems;
pub mod types;

// Re-export key types at crate root
pub use error::{DemucsCliError, Result};
pub use pipeline::{process_audio_file, process_audio_files_with_progress};
pub use probe::check_environment;
pub use types::{
    BatchProcessResult, DependencyStatus, Device, EnvironmentStatus, FileProcessResult, OutputFormat,
    ProcessResult, StemFileSet,
};
