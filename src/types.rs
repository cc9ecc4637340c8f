//! Core data types for demucs-cli
//!
//! Results and statuses shared by the probe, pipeline and report modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// Processing choices
// =============================================================================

/// Compute device handed to demucs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
    Mps,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::Mps => "mps",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stem output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Wav,
    Mp3,
    Flac,
}

impl OutputFormat {
    /// File extension demucs uses for stems in this format
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Flac => "flac",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// =============================================================================
// Environment probe results
// =============================================================================

/// Availability of one external tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub available: bool,
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn available(version: Option<String>) -> Self {
        Self {
            available: true,
            version,
        }
    }
}

/// Import check result for one python library inside the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Distribution name shown to the user (e.g. "hydra-core")
    pub name: String,
    pub installed: bool,
    pub version: Option<String>,
    /// Missing critical dependencies block overall readiness
    pub critical: bool,
}

/// Snapshot of the runtime environment, built once per check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentStatus {
    pub manager_available: bool,
    pub manager_version: Option<String>,
    pub env_exists: bool,
    pub env_name: String,
    pub tool_available: bool,
    pub tool_version: Option<String>,
    pub dependencies: Vec<DependencyStatus>,
    pub encoder_available: bool,
    pub encoder_version: Option<String>,
    /// False if the manager, environment, tool or any critical dependency is missing.
    /// The encoder never affects this.
    pub overall_success: bool,
}

impl EnvironmentStatus {
    /// Status with nothing checked yet
    pub fn unchecked(env_name: impl Into<String>) -> Self {
        Self {
            manager_available: false,
            manager_version: None,
            env_exists: false,
            env_name: env_name.into(),
            tool_available: false,
            tool_version: None,
            dependencies: Vec::new(),
            encoder_available: false,
            encoder_version: None,
            overall_success: false,
        }
    }

    /// Critical dependencies that were probed and found missing
    pub fn missing_critical(&self) -> Vec<&DependencyStatus> {
        self.dependencies
            .iter()
            .filter(|d| d.critical && !d.installed)
            .collect()
    }

    /// Non-critical dependencies that were probed and found missing
    pub fn missing_optional(&self) -> Vec<&DependencyStatus> {
        self.dependencies
            .iter()
            .filter(|d| !d.critical && !d.installed)
            .collect()
    }
}

// =============================================================================
// Stem layout
// =============================================================================

/// Paths of the four stems demucs writes for one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemFileSet {
    pub drums: PathBuf,
    pub bass: PathBuf,
    pub other: PathBuf,
    pub vocals: PathBuf,
}

impl StemFileSet {
    /// Stems mixed back together into the instrumental track
    pub fn accompaniment(&self) -> [&Path; 3] {
        [&self.drums, &self.bass, &self.other]
    }
}

// =============================================================================
// Processing results
// =============================================================================

/// Outcome of processing one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Instrumental track written by the best-effort merge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrumental: Option<PathBuf>,
}

impl ProcessResult {
    pub fn succeeded(output: Option<String>) -> Self {
        Self {
            success: true,
            output,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Process result tagged with its source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProcessResult {
    pub file: PathBuf,
    #[serde(flatten)]
    pub result: ProcessResult,
}

impl FileProcessResult {
    pub fn new(file: impl Into<PathBuf>, result: ProcessResult) -> Self {
        Self {
            file: file.into(),
            result,
        }
    }

    pub fn success(&self) -> bool {
        self.result.success
    }
}

/// Aggregate of a whole batch; `results` follows input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProcessResult {
    pub success: bool,
    pub results: Vec<FileProcessResult>,
}

impl BatchProcessResult {
    pub fn from_results(results: Vec<FileProcessResult>) -> Self {
        let success = results.iter().all(FileProcessResult::success);
        Self { success, results }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

// =============================================================================
// Supported input formats
// =============================================================================

/// Input audio formats accepted by discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    M4a,
    Aac,
    Ogg,
    Wma,
    Aiff,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "m4a" => Some(AudioFormat::M4a),
            "aac" => Some(AudioFormat::Aac),
            "ogg" => Some(AudioFormat::Ogg),
            "wma" => Some(AudioFormat::Wma),
            "aiff" | "aif" => Some(AudioFormat::Aiff),
            _ => None,
        }
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .is_some()
    }
}
