//! Single-file processing
//!
//! Turns [`ProcessOptions`] into one demucs invocation and, when demucs
//! succeeds, tries to mix an instrumental track from its stems.

use crate::config::{normalize_bitrate, ProcessOptions};
use crate::exec::{env_invocation, CommandRunner, SystemRunner};
use crate::stems::{self, find_stem_files, merge_audio_files};
use crate::types::{OutputFormat, ProcessResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Program name of the separation tool inside the environment
pub const DEMUCS: &str = "demucs";

/// Build the demucs argument list; the input path is always last
pub fn build_demucs_args(file: &Path, options: &ProcessOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-d".into(), options.device.as_str().into()];

    if let Some(model) = &options.model {
        args.push("-n".into());
        args.push(model.into());
    }

    if let Some(output_dir) = &options.output_dir {
        args.push("-o".into());
        args.push(output_dir.as_os_str().to_os_string());
    }

    match options.format {
        Some(OutputFormat::Mp3) => {
            args.push("--mp3".into());
            if let Some(bitrate) = options.mp3_bitrate.as_deref().and_then(normalize_bitrate) {
                args.push("--mp3-bitrate".into());
                args.push(bitrate.into());
            }
        }
        Some(format) => {
            args.push("--format".into());
            args.push(format.extension().into());
        }
        None => {}
    }

    if options.concurrency > 1 {
        args.push("-j".into());
        args.push(options.concurrency.to_string().into());
    }

    args.push(file.as_os_str().to_os_string());
    args
}

/// Join argv into a single line a POSIX shell would split back the same way.
///
/// Preview only: non-UTF-8 bytes are replaced.
pub fn shell_join(argv: &[OsString]) -> String {
    argv.iter()
        .map(|arg| shell_quote(&arg.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Separate one file with real processes and the default `conda`
pub async fn process_audio_file(file: &Path, options: &ProcessOptions) -> ProcessResult {
    process_audio_file_with(&SystemRunner::default(), file, options).await
}

/// Separate one file through the given runner.
///
/// Never fails: spawn errors and non-zero exits become a failed result.
pub async fn process_audio_file_with<R: CommandRunner>(
    runner: &R,
    file: &Path,
    options: &ProcessOptions,
) -> ProcessResult {
    let args = build_demucs_args(file, options);

    if options.dry_run {
        let argv = env_invocation(runner.manager_program(), &options.env_name, DEMUCS, &args);
        return ProcessResult::succeeded(Some(shell_join(&argv)));
    }

    debug!("Separating {}", file.display());
    let output = match runner.run_in_env(&options.env_name, DEMUCS, &args).await {
        Ok(output) => output,
        Err(e) => {
            warn!("Could not run demucs for {}: {}", file.display(), e);
            return ProcessResult::failed(e.to_string());
        }
    };

    if !output.success() {
        let message = if output.stderr.trim().is_empty() {
            output.stdout
        } else {
            output.stderr
        };
        return ProcessResult::failed(message);
    }

    let mut result = ProcessResult::succeeded(Some(output.stdout));
    result.instrumental = create_instrumental(runner, file, options).await;
    result
}

/// Mix drums, bass and other into an instrumental track.
///
/// Best effort: a missing stem or a failed merge is logged and never fails
/// the file.
async fn create_instrumental<R: CommandRunner>(
    runner: &R,
    file: &Path,
    options: &ProcessOptions,
) -> Option<PathBuf> {
    let output_dir = options.effective_output_dir();
    let model = options.effective_model();
    let format = options.effective_format();
    let name = stems::track_name(file);

    let Some(stem_files) = find_stem_files(&output_dir, model, &name, format) else {
        debug!(
            "Stems for {} not found under {}, skipping instrumental",
            file.display(),
            output_dir.display()
        );
        return None;
    };

    let target = stems::instrumental_path(&output_dir, model, &name, format);
    match merge_audio_files(runner, &stem_files.accompaniment(), &target, &options.env_name).await {
        Ok(()) => {
            info!("Created instrumental for {}", file.display());
            Some(target)
        }
        Err(e) => {
            warn!("Instrumental for {} failed: {}", file.display(), e);
            None
        }
    }
}
