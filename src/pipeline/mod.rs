//! Separation pipeline
//!
//! `processor` handles a single file, `orchestrator` drives a batch.

pub mod orchestrator;
pub mod processor;

pub use orchestrator::{
    partition_groups, process_audio_files_with, process_audio_files_with_progress, BatchReporter,
    NoopReporter,
};
pub use processor::{build_demucs_args, process_audio_file, process_audio_file_with, shell_join};
