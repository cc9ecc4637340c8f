//! Console rendering of probe results and batch progress

use crate::pipeline::BatchReporter;
use crate::types::{BatchProcessResult, EnvironmentStatus, FileProcessResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Render the environment check as human-readable lines
pub fn format_environment_status(status: &EnvironmentStatus) -> String {
    let mut lines: Vec<String> = vec!["Environment check:".to_string(), String::new()];
    let env = &status.env_name;

    if status.manager_available {
        lines.push("✓ conda installed".to_string());
        if let Some(version) = &status.manager_version {
            lines.push(format!("  version: {}", version));
        }
    } else {
        lines.push("✗ conda not found".to_string());
        lines.push("  Install Miniconda or Anaconda: https://docs.conda.io/en/latest/miniconda.html".to_string());
    }

    if status.env_exists {
        lines.push(format!("✓ conda environment '{}' exists", env));
    } else if status.manager_available {
        lines.push(format!("✗ conda environment '{}' not found", env));
        lines.push(format!("  Create it with: conda create -n {} python=3.10", env));
    }

    if status.tool_available {
        lines.push("✓ demucs installed".to_string());
        if let Some(version) = &status.tool_version {
            lines.push(format!("  version: {}", version));
        }
    } else if status.env_exists {
        lines.push("✗ demucs not installed or not runnable".to_string());
        lines.push(format!("  conda activate {}", env));
        lines.push("  conda install pytorch cpuonly -c pytorch".to_string());
        lines.push("  conda install ffmpeg -c conda-forge".to_string());
        lines.push("  pip install demucs".to_string());
    }

    if status.tool_available && !status.dependencies.is_empty() {
        lines.push(String::new());
        lines.push("Python dependencies:".to_string());
        for dep in &status.dependencies {
            let tag = if dep.critical { " [critical]" } else { "" };
            if dep.installed {
                let version = dep
                    .version
                    .as_deref()
                    .map(|v| format!(" ({})", v))
                    .unwrap_or_default();
                lines.push(format!("  ✓ {}{}{}", dep.name, version, tag));
            } else {
                let tag = if dep.critical { tag } else { " [optional]" };
                lines.push(format!("  ✗ {}{}", dep.name, tag));
            }
        }

        let missing = status.missing_critical();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|d| d.name.as_str()).collect();
            lines.push(String::new());
            lines.push(format!("⚠ Missing critical dependencies: {}", names.join(", ")));
            lines.push(format!("  conda activate {}", env));
            lines.push(format!("  pip install {}", names.join(" ")));
        }
        lines.push(String::new());

        if status.encoder_available {
            lines.push("✓ ffmpeg installed".to_string());
            if let Some(version) = &status.encoder_version {
                lines.push(format!("  version: {}", version));
            }
        } else {
            lines.push("⚠ ffmpeg not found (instrumental tracks will not be created)".to_string());
            lines.push(format!("  conda install ffmpeg -c conda-forge -n {}", env));
        }
    }

    lines.push(String::new());
    if status.overall_success {
        lines.push("Environment ready.".to_string());
    } else {
        lines.push("Environment check failed. Fix the issues above and retry.".to_string());
    }

    lines.join("\n")
}

/// Print the environment check to stdout
pub fn print_environment_status(status: &EnvironmentStatus) {
    println!("{}", format_environment_status(status));
}

/// Final one-line tally
pub fn format_summary(batch: &BatchProcessResult) -> String {
    let total = batch.results.len();
    if batch.success {
        format!("All done! ({}/{})", total, total)
    } else {
        format!("Finished: {}/{} succeeded", batch.succeeded(), total)
    }
}

/// Batch reporter that draws a spinner per file when processing sequentially
/// and one line per group otherwise
pub struct ConsoleReporter {
    spinners: bool,
    verbose: bool,
    spinner: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new(show_progress: bool, verbose: bool, concurrency: usize) -> Self {
        Self {
            spinners: show_progress && concurrency <= 1,
            verbose,
            spinner: None,
        }
    }

    fn label(index: usize, total: usize, file: &Path) -> String {
        format!("[{}/{}] {}", index + 1, total, file.display())
    }
}

impl BatchReporter for ConsoleReporter {
    fn file_started(&mut self, index: usize, total: usize, file: &Path) {
        if !self.spinners {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Processing {}", Self::label(index, total, file)));
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn file_finished(&mut self, index: usize, total: usize, result: &FileProcessResult) {
        let label = Self::label(index, total, &result.file);
        let line = if result.success() {
            format!("✓ Done {}", label)
        } else {
            format!("✗ Failed {}", label)
        };

        match self.spinner.take() {
            Some(spinner) => spinner.finish_with_message(line),
            None => println!("{}", line),
        }

        if self.verbose {
            if let Some(error) = &result.result.error {
                println!("  error: {}", error.trim_end());
            }
            if let Some(instrumental) = &result.result.instrumental {
                println!("  instrumental: {}", instrumental.display());
            }
        }
    }

    fn group_finished(&mut self, group: usize, groups: usize, results: &[FileProcessResult]) {
        if results.len() > 1 {
            let ok = results.iter().filter(|r| r.success()).count();
            println!("[group {}/{}] {}/{} succeeded", group + 1, groups, ok, results.len());
        }
    }
}
