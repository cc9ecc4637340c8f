//! Stem lookup and instrumental track generation
//!
//! After demucs finishes, the drums, bass and other stems are mixed into a
//! single instrumental track next to them.

pub mod locator;
pub mod merge;

pub use locator::{find_stem_files, instrumental_path, stem_paths, track_name};
pub use merge::merge_audio_files;
