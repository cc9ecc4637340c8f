//! Locating the stems demucs wrote for a track
//!
//! Demucs writes `<output>/<model>/<track name>/<stem>.<ext>`.

use crate::types::{OutputFormat, StemFileSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the merged accompaniment track, without extension
pub const INSTRUMENTAL_STEM: &str = "instrumental";

/// Directory holding the stems of one track
pub fn stem_dir(output_dir: &Path, model: &str, track_name: impl AsRef<Path>) -> PathBuf {
    output_dir.join(model).join(track_name)
}

/// Build the four stem paths without touching the filesystem
pub fn stem_paths(output_dir: &Path, model: &str, track_name: impl AsRef<Path>, format: OutputFormat) -> StemFileSet {
    let dir = stem_dir(output_dir, model, track_name);
    let ext = format.extension();
    StemFileSet {
        drums: dir.join(format!("drums.{ext}")),
        bass: dir.join(format!("bass.{ext}")),
        other: dir.join(format!("other.{ext}")),
        vocals: dir.join(format!("vocals.{ext}")),
    }
}

/// Where the instrumental track for this track goes
pub fn instrumental_path(
    output_dir: &Path,
    model: &str,
    track_name: impl AsRef<Path>,
    format: OutputFormat,
) -> PathBuf {
    stem_dir(output_dir, model, track_name).join(format!("{INSTRUMENTAL_STEM}.{}", format.extension()))
}

/// Find the stems for a track.
///
/// Returns `None` unless drums, bass and other all exist. Vocals are not
/// required since they are not part of the instrumental mix.
pub fn find_stem_files(
    output_dir: &Path,
    model: &str,
    track_name: impl AsRef<Path>,
    format: OutputFormat,
) -> Option<StemFileSet> {
    let stems = stem_paths(output_dir, model, track_name, format);

    for path in stems.accompaniment() {
        if !path.is_file() {
            debug!("Stem not found: {}", path.display());
            return None;
        }
    }

    Some(stems)
}

/// Track name demucs uses for an input file: its name without extension.
///
/// Kept as raw OS bytes so the lookup matches the directory demucs created.
pub fn track_name(input: &Path) -> OsString {
    input.file_stem().map(|s| s.to_os_string()).unwrap_or_default()
}
