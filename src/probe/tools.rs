//! Per-tool availability probes
//!
//! Each external tool sits behind [`ToolProbe`] so the free-text version
//! parsing stays in one place and tests can feed canned output.

use crate::exec::CommandRunner;
use crate::types::ToolStatus;
use regex::Regex;
use std::ffi::OsString;
use std::sync::OnceLock;
use tracing::debug;

/// Capability check for one external tool
#[allow(async_fn_in_trait)]
pub trait ToolProbe {
    /// Tool name (for logging)
    fn name(&self) -> &'static str;

    /// Check whether the tool runs and which version it reports.
    ///
    /// Never fails: any spawn error or non-zero exit means unavailable.
    async fn probe(&self) -> ToolStatus;
}

/// The conda executable itself
pub struct CondaProbe<'a, R> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> CondaProbe<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> ToolProbe for CondaProbe<'_, R> {
    fn name(&self) -> &'static str {
        "conda"
    }

    async fn probe(&self) -> ToolStatus {
        let program = self.runner.manager_program().to_string();
        match self.runner.run(&program, &[OsString::from("--version")]).await {
            Ok(output) if output.success() => {
                ToolStatus::available(non_empty(output.stdout.trim()))
            }
            Ok(output) => {
                debug!("{} --version exited with {}", program, output.exit_code);
                ToolStatus::unavailable()
            }
            Err(e) => {
                debug!("{} unavailable: {}", program, e);
                ToolStatus::unavailable()
            }
        }
    }
}

/// Demucs inside a conda environment
pub struct DemucsProbe<'a, R> {
    runner: &'a R,
    env_name: &'a str,
}

impl<'a, R: CommandRunner> DemucsProbe<'a, R> {
    pub fn new(runner: &'a R, env_name: &'a str) -> Self {
        Self { runner, env_name }
    }
}

impl<R: CommandRunner> ToolProbe for DemucsProbe<'_, R> {
    fn name(&self) -> &'static str {
        "demucs"
    }

    async fn probe(&self) -> ToolStatus {
        let help = self
            .runner
            .run_in_env(self.env_name, "demucs", &[OsString::from("--help")])
            .await;
        match help {
            Ok(output) if output.success() => {}
            Ok(output) => {
                debug!("demucs --help exited with {}", output.exit_code);
                return ToolStatus::unavailable();
            }
            Err(e) => {
                debug!("demucs unavailable: {}", e);
                return ToolStatus::unavailable();
            }
        }

        let version = match self
            .runner
            .run_in_env(self.env_name, "demucs", &[OsString::from("--version")])
            .await
        {
            Ok(output) if output.success() => parse_demucs_version(&output.stdout),
            _ => None,
        };

        ToolStatus::available(version)
    }
}

/// ffmpeg inside a conda environment
pub struct FfmpegProbe<'a, R> {
    runner: &'a R,
    env_name: &'a str,
}

impl<'a, R: CommandRunner> FfmpegProbe<'a, R> {
    pub fn new(runner: &'a R, env_name: &'a str) -> Self {
        Self { runner, env_name }
    }
}

impl<R: CommandRunner> ToolProbe for FfmpegProbe<'_, R> {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn probe(&self) -> ToolStatus {
        match self
            .runner
            .run_in_env(self.env_name, "ffmpeg", &[OsString::from("-version")])
            .await
        {
            Ok(output) if output.success() => {
                ToolStatus::available(parse_ffmpeg_version(&output.stdout))
            }
            Ok(output) => {
                debug!("ffmpeg -version exited with {}", output.exit_code);
                ToolStatus::unavailable()
            }
            Err(e) => {
                debug!("ffmpeg unavailable: {}", e);
                ToolStatus::unavailable()
            }
        }
    }
}

/// Check whether `conda env list` mentions the environment
pub async fn env_exists<R: CommandRunner>(runner: &R, env_name: &str) -> bool {
    let program = runner.manager_program().to_string();
    match runner
        .run(&program, &[OsString::from("env"), OsString::from("list")])
        .await
    {
        Ok(output) if output.success() => output.stdout.contains(env_name),
        Ok(output) => {
            debug!("{} env list exited with {}", program, output.exit_code);
            false
        }
        Err(e) => {
            debug!("{} env list failed: {}", program, e);
            false
        }
    }
}

/// Extract "X.Y.Z" from demucs' version banner, else the trimmed output
pub fn parse_demucs_version(stdout: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)demucs\s+(\d+\.\d+\.\d+)").expect("demucs version pattern is valid")
    });

    match pattern.captures(stdout) {
        Some(caps) => Some(caps[1].to_string()),
        None => non_empty(stdout.trim()),
    }
}

/// Extract the version token from `ffmpeg -version`, else its first line
pub fn parse_ffmpeg_version(stdout: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"ffmpeg version (\S+)").expect("ffmpeg version pattern is valid")
    });

    match pattern.captures(stdout) {
        Some(caps) => Some(caps[1].to_string()),
        None => stdout.lines().next().and_then(|l| non_empty(l.trim())),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
