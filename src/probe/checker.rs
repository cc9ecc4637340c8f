//! Environment readiness check
//!
//! Checks run in dependency order and stop at the first missing hard
//! prerequisite: conda, then the environment, then demucs. Later checks
//! cannot run without the earlier ones.

use super::dependencies::check_dependencies;
use super::tools::{env_exists, CondaProbe, DemucsProbe, FfmpegProbe, ToolProbe};
use crate::error::{DemucsCliError, Result};
use crate::exec::{CommandRunner, SystemRunner};
use crate::types::EnvironmentStatus;
use tracing::{debug, info, warn};

/// Check the environment using real processes and the default `conda`
pub async fn check_environment(env_name: &str) -> EnvironmentStatus {
    check_environment_with(&SystemRunner::default(), env_name).await
}

/// Check the environment through the given runner.
///
/// Always returns a complete status; unavailable tools are reported, not raised.
pub async fn check_environment_with<R: CommandRunner>(runner: &R, env_name: &str) -> EnvironmentStatus {
    let mut status = EnvironmentStatus::unchecked(env_name);

    let conda = CondaProbe::new(runner).probe().await;
    status.manager_available = conda.available;
    status.manager_version = conda.version;
    if !status.manager_available {
        warn!("{} is not available", runner.manager_program());
        return status;
    }

    status.env_exists = env_exists(runner, env_name).await;
    if !status.env_exists {
        warn!("Conda environment '{}' does not exist", env_name);
        return status;
    }

    let demucs = DemucsProbe::new(runner, env_name);
    let tool = demucs.probe().await;
    status.tool_available = tool.available;
    status.tool_version = tool.version;
    if !status.tool_available {
        warn!("{} is not usable in '{}'", demucs.name(), env_name);
        return status;
    }

    status.dependencies = check_dependencies(runner, env_name).await;
    let missing: Vec<String> = status
        .missing_critical()
        .iter()
        .map(|d| d.name.clone())
        .collect();
    if !missing.is_empty() {
        warn!("Missing critical dependencies: {}", missing.join(", "));
    }

    // ffmpeg only feeds the instrumental merge, so it never gates readiness
    let ffmpeg = FfmpegProbe::new(runner, env_name);
    let encoder = ffmpeg.probe().await;
    status.encoder_available = encoder.available;
    status.encoder_version = encoder.version;
    if !status.encoder_available {
        debug!("{} not found, instrumental tracks will be skipped", ffmpeg.name());
    }

    status.overall_success = missing.is_empty();
    if status.overall_success {
        info!(
            "Environment '{}' ready (demucs {})",
            env_name,
            status.tool_version.as_deref().unwrap_or("unknown")
        );
    }

    status
}

/// Turn a failed check into an error naming the first unmet prerequisite
pub fn require_ready(status: &EnvironmentStatus) -> Result<()> {
    if status.overall_success {
        return Ok(());
    }

    let reason = if !status.manager_available {
        "conda is not installed or not on PATH".to_string()
    } else if !status.env_exists {
        format!("conda environment '{}' does not exist", status.env_name)
    } else if !status.tool_available {
        format!("demucs cannot run in '{}'", status.env_name)
    } else {
        let names: Vec<&str> = status
            .missing_critical()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        format!("missing critical dependencies: {}", names.join(", "))
    };

    Err(DemucsCliError::EnvironmentNotReady { reason })
}
