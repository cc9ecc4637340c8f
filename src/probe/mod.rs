//! Runtime environment probing
//!
//! Verifies that conda, the named environment, demucs, its key python
//! libraries and ffmpeg are usable before any file is processed.

pub mod checker;
pub mod dependencies;
pub mod tools;

pub use checker::{check_environment, check_environment_with, require_ready};
pub use dependencies::{Dependency, DEPENDENCIES};
pub use tools::{CondaProbe, DemucsProbe, FfmpegProbe, ToolProbe};
