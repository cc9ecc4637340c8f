//! JSON report of a finished batch

use crate::config::ProcessOptions;
use crate::error::{DemucsCliError, Result};
use crate::types::BatchProcessResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// JSON report schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level report structure
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchReport {
    /// Schema version for forward compatibility
    pub version: String,
    pub metadata: ReportMetadata,
    /// One entry per input file, in input order
    pub results: Vec<FileReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// demucs-cli version that generated this file
    pub generator_version: String,
    pub exported_at: String,
    pub file_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub model: String,
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Merged instrumental track, when one was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrumental: Option<String>,
}

/// Build the report without writing it
pub fn build_report(batch: &BatchProcessResult, options: &ProcessOptions) -> BatchReport {
    BatchReport {
        version: SCHEMA_VERSION.to_string(),
        metadata: ReportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            file_count: batch.results.len(),
            succeeded: batch.succeeded(),
            failed: batch.failed(),
            model: options.effective_model().to_string(),
            device: options.device.to_string(),
        },
        results: batch
            .results
            .iter()
            .map(|r| FileReport {
                file: r.file.to_string_lossy().to_string(),
                success: r.result.success,
                error: r.result.error.clone(),
                instrumental: r
                    .result
                    .instrumental
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string()),
            })
            .collect(),
    }
}

/// Write the batch report to a JSON file
///
/// Writes to a temp file next to the target, then renames it into place.
pub fn write_report(batch: &BatchProcessResult, options: &ProcessOptions, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| DemucsCliError::output_error(parent, e))?;
        }
    }

    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| DemucsCliError::OutputError {
        path: output_path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let writer = BufWriter::new(file);
    let report = build_report(batch, options);

    serde_json::to_writer_pretty(writer, &report).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        DemucsCliError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        DemucsCliError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!(
        "Wrote report for {} files to {}",
        report.results.len(),
        output_path.display()
    );

    Ok(())
}
