//! Input expansion
//!
//! Turns the paths given on the command line into the ordered list of audio
//! files handed to demucs.

use crate::error::{DemucsCliError, Result};
use crate::types::AudioFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// An audio file found while expanding an input path
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

/// Expand one input path.
///
/// A file must itself be a supported, non-empty audio file. A directory is
/// walked in file-name order, descending only when `recursive` is set.
pub fn scan(input: &Path, recursive: bool) -> Result<Vec<DiscoveredFile>> {
    let metadata = std::fs::metadata(input)
        .map_err(|_| DemucsCliError::FileNotFound(input.to_path_buf()))?;

    if metadata.is_file() {
        let format = input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown");
        return probe_file(input)
            .map(|file| vec![file])
            .ok_or_else(|| DemucsCliError::UnsupportedFormat {
                path: input.to_path_buf(),
                format: format.to_string(),
            });
    }

    let depth = if recursive { usize::MAX } else { 1 };
    let files: Vec<DiscoveredFile> = WalkDir::new(input)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Unreadable entry under {}: {}", input.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| probe_file(entry.path()))
        .collect();

    if files.is_empty() {
        warn!("{} contains no supported audio files", input.display());
    } else {
        info!("{}: {} audio files", input.display(), files.len());
    }

    Ok(files)
}

/// Expand every input in order, skipping paths that cannot be used.
///
/// Fails only when nothing usable remains.
pub fn collect(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        match scan(input, recursive) {
            Ok(found) => paths.extend(found.into_iter().map(|f| f.path)),
            Err(e) => warn!("Skipping {}: {}", input.display(), e),
        }
    }

    if paths.is_empty() {
        return Err(DemucsCliError::NoAudioFiles);
    }

    Ok(paths)
}

/// Accept `path` if its extension is supported and it holds any bytes
fn probe_file(path: &Path) -> Option<DiscoveredFile> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(AudioFormat::from_extension)?;

    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if size_bytes == 0 {
        debug!("Ignoring empty file: {}", path.display());
        return None;
    }

    debug!("Found {}", path.display());
    Some(DiscoveredFile {
        path: path.to_path_buf(),
        format,
        size_bytes,
    })
}
