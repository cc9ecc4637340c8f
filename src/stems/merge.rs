//! Mixing stems back together with ffmpeg

use crate::error::{DemucsCliError, Result};
use crate::exec::CommandRunner;
use std::ffi::OsString;
use std::path::Path;
use tracing::{debug, info};

/// Seconds amix takes to renormalise volume when an input ends
const DROPOUT_TRANSITION_SECS: u32 = 2;

/// Build the `-filter_complex` graph that mixes every input into `[aout]`
pub fn amix_filter(inputs: usize) -> String {
    let labels: String = (0..inputs).map(|i| format!("[{i}:a]")).collect();
    format!("{labels}amix=inputs={inputs}:duration=longest:dropout_transition={DROPOUT_TRANSITION_SECS}[aout]")
}

/// Build ffmpeg arguments that overwrite `output` with a mix of `inputs`
pub fn merge_args(inputs: &[&Path], output: &Path) -> Vec<OsString> {
    let mut args = vec![OsString::from("-y")];
    for input in inputs {
        args.push("-i".into());
        args.push(input.as_os_str().to_os_string());
    }
    args.push("-filter_complex".into());
    args.push(amix_filter(inputs.len()).into());
    args.push("-map".into());
    args.push("[aout]".into());
    args.push(output.as_os_str().to_os_string());
    args
}

/// Mix `inputs` into `output` using ffmpeg from the conda environment.
///
/// Every input must exist; ffmpeg is not started otherwise.
pub async fn merge_audio_files<R: CommandRunner>(
    runner: &R,
    inputs: &[&Path],
    output: &Path,
    env_name: &str,
) -> Result<()> {
    if let Some(missing) = inputs.iter().find(|p| !p.exists()) {
        return Err(DemucsCliError::MergeInputMissing(missing.to_path_buf()));
    }

    debug!("Mixing {} stems into {}", inputs.len(), output.display());
    let result = runner
        .run_in_env(env_name, "ffmpeg", &merge_args(inputs, output))
        .await?;

    if result.success() {
        info!("Instrumental written to {}", output.display());
        Ok(())
    } else {
        let stderr = result.stderr.trim();
        let message = if stderr.is_empty() {
            "ffmpeg merge failed".to_string()
        } else {
            stderr.to_string()
        };
        Err(DemucsCliError::InvocationFailure {
            program: "ffmpeg".to_string(),
            code: result.exit_code,
            message,
        })
    }
}
