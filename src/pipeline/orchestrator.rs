//! Batch orchestration
//!
//! Files run in consecutive groups of `concurrency` files. Members of a group
//! run concurrently and the whole group finishes before the next starts, so
//! at most `concurrency` demucs processes exist at once. Sequential processing
//! is the same loop with groups of one.

use super::processor::process_audio_file_with;
use crate::config::ProcessOptions;
use crate::exec::{CommandRunner, SystemRunner};
use crate::types::{BatchProcessResult, FileProcessResult};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Receives progress as the batch runs
pub trait BatchReporter {
    /// Called before a file starts; `index` is its position in the input
    fn file_started(&mut self, _index: usize, _total: usize, _file: &Path) {}

    /// Called once per file, in input order
    fn file_finished(&mut self, _index: usize, _total: usize, _result: &FileProcessResult) {}

    /// Called after every group completes
    fn group_finished(&mut self, _group: usize, _groups: usize, _results: &[FileProcessResult]) {}
}

/// Reporter that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl BatchReporter for NoopReporter {}

/// Split files into the groups the orchestrator runs, in order
pub fn partition_groups(files: &[PathBuf], concurrency: usize) -> Vec<&[PathBuf]> {
    files.chunks(concurrency.max(1)).collect()
}

/// Process files with real processes and the default `conda`
pub async fn process_audio_files_with_progress(
    files: &[PathBuf],
    options: &ProcessOptions,
) -> BatchProcessResult {
    process_audio_files_with(&SystemRunner::default(), files, options, &mut NoopReporter).await
}

/// Process every file through the given runner.
///
/// A failed file never stops the batch. `results` follows the order of
/// `files` whatever order group members complete in.
pub async fn process_audio_files_with<R: CommandRunner>(
    runner: &R,
    files: &[PathBuf],
    options: &ProcessOptions,
    reporter: &mut dyn BatchReporter,
) -> BatchProcessResult {
    let start = Instant::now();
    let total = files.len();
    let groups = partition_groups(files, options.concurrency);
    let group_count = groups.len();
    let mut results: Vec<FileProcessResult> = Vec::with_capacity(total);

    info!(
        "Processing {} files in {} group(s) of up to {}",
        total,
        group_count,
        options.concurrency.max(1)
    );

    for (group_index, group) in groups.into_iter().enumerate() {
        let offset = results.len();
        for (i, file) in group.iter().enumerate() {
            reporter.file_started(offset + i, total, file);
        }

        // join_all yields outputs in the order of its inputs
        let outcomes = join_all(
            group
                .iter()
                .map(|file| process_audio_file_with(runner, file, options)),
        )
        .await;

        for (i, (file, outcome)) in group.iter().zip(outcomes).enumerate() {
            let result = FileProcessResult::new(file.clone(), outcome);
            if result.success() {
                debug!("Finished {}", file.display());
            } else {
                warn!(
                    "Failed {}: {}",
                    file.display(),
                    result.result.error.as_deref().unwrap_or("unknown error")
                );
            }
            reporter.file_finished(offset + i, total, &result);
            results.push(result);
        }

        reporter.group_finished(group_index, group_count, &results[offset..]);
    }

    let batch = BatchProcessResult::from_results(results);
    info!(
        "Batch finished in {:.2}s: {}/{} succeeded",
        start.elapsed().as_secs_f64(),
        batch.succeeded(),
        total
    );
    batch
}
