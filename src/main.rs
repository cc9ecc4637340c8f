//! demucs-cli entry point

use clap::Parser;
use demucs_cli::config::{Cli, Settings};
use demucs_cli::exec::SystemRunner;
use demucs_cli::pipeline::{process_audio_file_with, process_audio_files_with};
use demucs_cli::probe::{check_environment_with, require_ready};
use demucs_cli::report::{self, ConsoleReporter};
use demucs_cli::{discovery, export};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let settings = Settings::from_cli(&cli);
    let runner = SystemRunner::new(settings.conda_program.clone()).with_timeout(settings.command_timeout);

    // Environment-only check
    if settings.check_only {
        let status = check_environment_with(&runner, &settings.process.env_name).await;
        report::print_environment_status(&status);
        return if status.overall_success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    // Dry runs never spawn anything, so they skip the probe
    if !settings.process.dry_run {
        println!("Checking environment...");
        let status = check_environment_with(&runner, &settings.process.env_name).await;
        if let Err(e) = require_ready(&status) {
            report::print_environment_status(&status);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
        println!("✓ Environment ready");
        println!();
    }

    if settings.inputs.is_empty() {
        eprintln!("Error: no input files or directories given\n\n  Example:\n    demucs-cli ./music -o ./stems");
        return ExitCode::FAILURE;
    }

    if let Err(e) = settings.process.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let files = match discovery::collect(&settings.inputs, settings.recursive) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("Found {} audio files", files.len());
    println!();

    if settings.process.dry_run {
        println!("=== DRY RUN MODE ===");
        println!();
        for file in &files {
            let result = process_audio_file_with(&runner, file, &settings.process).await;
            if let Some(command) = result.output {
                println!("{}", command);
            }
        }
        return ExitCode::SUCCESS;
    }

    info!("Starting batch of {} files", files.len());
    let mut reporter = ConsoleReporter::new(
        settings.show_progress,
        settings.process.verbose,
        settings.process.concurrency,
    );
    // Dropping the batch on Ctrl-C kills every running command's process group
    let batch = tokio::select! {
        batch = process_audio_files_with(&runner, &files, &settings.process, &mut reporter) => batch,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            return ExitCode::from(130);
        }
    };

    println!();
    println!("{}", report::format_summary(&batch));

    if let Some(path) = &settings.report_path {
        if let Err(e) = export::write_report(&batch, &settings.process, path) {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if batch.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn init_logging(cli: &Cli) {
    let filter = cli.log_level().to_string().to_lowercase();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
