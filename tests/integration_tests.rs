//! Integration tests for the demucs-cli pipeline
//!
//! These tests drive the public API through a scripted command runner, so no
//! conda, demucs or ffmpeg installation is needed.

use demucs_cli::config::ProcessOptions;
use demucs_cli::exec::{CommandOutput, CommandRunner};
use demucs_cli::pipeline::{process_audio_file_with, process_audio_files_with, BatchReporter, NoopReporter};
use demucs_cli::probe::check_environment_with;
use demucs_cli::stems::merge_audio_files;
use demucs_cli::{DemucsCliError, FileProcessResult, OutputFormat};
use std::cell::{Cell, RefCell};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

// =============================================================================
// Scripted runner
// =============================================================================

/// Canned reply for one invocation
struct Reply {
    output: CommandOutput,
    delay: Duration,
}

fn ok(stdout: &str) -> demucs_cli::Result<Reply> {
    Ok(Reply {
        output: CommandOutput {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        },
        delay: Duration::ZERO,
    })
}

fn exit(code: i32, stdout: &str, stderr: &str) -> demucs_cli::Result<Reply> {
    Ok(Reply {
        output: CommandOutput {
            exit_code: code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        },
        delay: Duration::ZERO,
    })
}

fn spawn_error(program: &str) -> demucs_cli::Result<Reply> {
    Err(DemucsCliError::spawn_failure(
        program,
        std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
    ))
}

type Script = Box<dyn Fn(&[String]) -> demucs_cli::Result<Reply>>;

/// Runner that answers from a script and records every argv it receives
struct ScriptedRunner {
    script: Script,
    calls: RefCell<Vec<Vec<String>>>,
    raw_args: RefCell<Vec<Vec<OsString>>>,
    active: Cell<usize>,
    peak: Cell<usize>,
}

impl ScriptedRunner {
    fn new(script: impl Fn(&[String]) -> demucs_cli::Result<Reply> + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: RefCell::new(Vec::new()),
            raw_args: RefCell::new(Vec::new()),
            active: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Invocations whose in-environment command is `command`
    fn env_calls(&self, command: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|argv| env_command(argv) == Some(command))
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn manager_program(&self) -> &str {
        "conda"
    }

    async fn run(&self, program: &str, args: &[OsString]) -> demucs_cli::Result<CommandOutput> {
        let mut argv = vec![program.to_string()];
        argv.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
        self.calls.borrow_mut().push(argv.clone());
        self.raw_args.borrow_mut().push(args.to_vec());

        let reply = (self.script)(&argv)?;

        self.active.set(self.active.get() + 1);
        self.peak.set(self.peak.get().max(self.active.get()));
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        self.active.set(self.active.get() - 1);

        Ok(reply.output)
    }
}

/// Command run inside `conda run -n <env> --no-capture-output <command> ...`
fn env_command(argv: &[String]) -> Option<&str> {
    if argv.get(1).map(String::as_str) == Some("run") {
        argv.get(5).map(String::as_str)
    } else {
        None
    }
}

fn python_script(argv: &[String]) -> &str {
    argv.last().map(String::as_str).unwrap_or("")
}

/// A fully working environment, except for the listed missing pieces
fn environment_script(
    missing_modules: &'static [&'static str],
    ffmpeg_installed: bool,
) -> impl Fn(&[String]) -> demucs_cli::Result<Reply> {
    move |argv: &[String]| {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["conda", "--version"] => ok("conda 24.1.2\n"),
            ["conda", "env", "list"] => ok("# conda environments:\nbase  *  /opt/conda\ndemucs   /opt/conda/envs/demucs\n"),
            _ => match env_command(argv) {
                Some("demucs") if args.last() == Some(&"--help") => ok("usage: demucs [-h]"),
                Some("demucs") if args.last() == Some(&"--version") => ok("demucs 4.0.1\n"),
                Some("python") => {
                    let script = python_script(argv);
                    let missing = missing_modules
                        .iter()
                        .any(|m| script.contains(&format!("'{m}'")) || script.starts_with(&format!("import {m}\n")));
                    if missing {
                        exit(1, "", "")
                    } else if script.contains("find_spec") {
                        ok("/opt/conda/envs/demucs/lib/python3.10/site-packages/mod/__init__.py\n")
                    } else {
                        ok("2.1.0\n")
                    }
                }
                Some("ffmpeg") if ffmpeg_installed => ok("ffmpeg version 6.1.1 Copyright (c) 2000-2023\n"),
                Some("ffmpeg") => exit(127, "", "ffmpeg: command not found"),
                _ => exit(2, "", "unexpected command"),
            },
        }
    }
}

/// Demucs that writes the given stems for each input, ffmpeg that exits with `ffmpeg_code`
fn separation_script(
    output_dir: PathBuf,
    stems: &'static [&'static str],
    ffmpeg_code: i32,
) -> impl Fn(&[String]) -> demucs_cli::Result<Reply> {
    move |argv: &[String]| match env_command(argv) {
        Some("demucs") => {
            let input = PathBuf::from(argv.last().unwrap());
            let track = input.file_stem().unwrap().to_string_lossy().into_owned();
            let dir = output_dir.join("htdemucs").join(track);
            fs::create_dir_all(&dir).unwrap();
            for stem in stems {
                fs::write(dir.join(format!("{stem}.wav")), b"RIFF").unwrap();
            }
            ok("Separated tracks will be stored in ...\n")
        }
        Some("ffmpeg") if ffmpeg_code == 0 => ok(""),
        Some("ffmpeg") => exit(ffmpeg_code, "", "Invalid data found when processing input"),
        _ => exit(2, "", "unexpected command"),
    }
}

fn options_for(output_dir: &Path) -> ProcessOptions {
    ProcessOptions {
        model: Some("htdemucs".to_string()),
        output_dir: Some(output_dir.to_path_buf()),
        ..ProcessOptions::default()
    }
}

/// Reporter that records the callbacks it receives
#[derive(Default)]
struct RecordingReporter {
    events: Vec<String>,
    group_sizes: Vec<usize>,
}

impl BatchReporter for RecordingReporter {
    fn file_started(&mut self, index: usize, _total: usize, _file: &Path) {
        self.events.push(format!("start {index}"));
    }

    fn file_finished(&mut self, index: usize, _total: usize, result: &FileProcessResult) {
        let state = if result.success() { "ok" } else { "fail" };
        self.events.push(format!("finish {index} {state}"));
    }

    fn group_finished(&mut self, _group: usize, _groups: usize, results: &[FileProcessResult]) {
        self.group_sizes.push(results.len());
    }
}

// =============================================================================
// Environment probe
// =============================================================================

#[tokio::test]
async fn test_missing_conda_stops_after_first_probe() {
    let runner = ScriptedRunner::new(|argv: &[String]| spawn_error(&argv[0]));

    let status = check_environment_with(&runner, "demucs").await;

    assert!(!status.overall_success);
    assert!(!status.manager_available);
    assert!(!status.env_exists);
    assert!(!status.tool_available);
    assert!(!status.encoder_available);
    assert!(status.dependencies.is_empty());
    assert_eq!(runner.calls(), vec![vec!["conda".to_string(), "--version".to_string()]]);
}

#[tokio::test]
async fn test_conda_non_zero_exit_counts_as_missing() {
    let runner = ScriptedRunner::new(|_: &[String]| exit(1, "", "broken install"));

    let status = check_environment_with(&runner, "demucs").await;

    assert!(!status.manager_available);
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn test_missing_environment_stops_before_demucs() {
    let runner = ScriptedRunner::new(environment_script(&[], true));

    let status = check_environment_with(&runner, "stems-gpu").await;

    assert!(status.manager_available);
    assert_eq!(status.manager_version.as_deref(), Some("conda 24.1.2"));
    assert!(!status.env_exists);
    assert_eq!(status.env_name, "stems-gpu");
    assert!(!status.overall_success);
    assert_eq!(runner.calls().len(), 2);
}

#[tokio::test]
async fn test_missing_demucs_stops_before_dependencies() {
    let runner = ScriptedRunner::new(|argv: &[String]| match env_command(argv) {
        Some("demucs") => exit(1, "", "demucs: command not found"),
        Some(_) => exit(2, "", "unexpected"),
        None if argv[1] == "env" => ok("demucs /opt/conda/envs/demucs\n"),
        None => ok("conda 24.1.2"),
    });

    let status = check_environment_with(&runner, "demucs").await;

    assert!(status.env_exists);
    assert!(!status.tool_available);
    assert!(!status.overall_success);
    assert!(runner.env_calls("python").is_empty());
    assert!(runner.env_calls("ffmpeg").is_empty());
}

#[tokio::test]
async fn test_healthy_environment() {
    let runner = ScriptedRunner::new(environment_script(&[], true));

    let status = check_environment_with(&runner, "demucs").await;

    assert!(status.overall_success);
    assert_eq!(status.tool_version.as_deref(), Some("4.0.1"));
    assert_eq!(status.encoder_version.as_deref(), Some("6.1.1"));
    assert_eq!(status.dependencies.len(), demucs_cli::probe::DEPENDENCIES.len());
    assert!(status.dependencies.iter().all(|d| d.installed));
    assert_eq!(status.dependencies[0].name, "torch");
    assert_eq!(status.dependencies[0].version.as_deref(), Some("2.1.0"));
}

#[tokio::test]
async fn test_each_missing_critical_dependency_fails_check() {
    const CASES: [&[&str]; 4] = [&["torch"], &["torchaudio"], &["julius"], &["einops"]];

    for missing in CASES {
        let runner = ScriptedRunner::new(environment_script(missing, true));

        let status = check_environment_with(&runner, "demucs").await;

        assert!(!status.overall_success, "{:?} missing should fail", missing);
        let names: Vec<&str> = status.missing_critical().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, missing);
        // ffmpeg is still probed after a dependency failure
        assert!(status.encoder_available);
    }
}

#[tokio::test]
async fn test_missing_optional_dependencies_do_not_fail_check() {
    let runner = ScriptedRunner::new(environment_script(&["diffq", "hydra", "openunmix", "soundfile"], true));

    let status = check_environment_with(&runner, "demucs").await;

    assert!(status.overall_success);
    assert_eq!(status.missing_optional().len(), 4);
    assert!(status.missing_critical().is_empty());
    let hydra = status.dependencies.iter().find(|d| d.name == "hydra-core").unwrap();
    assert!(!hydra.installed);
    assert!(hydra.version.is_none());
}

#[tokio::test]
async fn test_missing_ffmpeg_does_not_fail_check() {
    let runner = ScriptedRunner::new(environment_script(&[], false));

    let status = check_environment_with(&runner, "demucs").await;

    assert!(status.overall_success);
    assert!(!status.encoder_available);
    assert!(status.encoder_version.is_none());
}

// =============================================================================
// Single-file processing
// =============================================================================

#[tokio::test]
async fn test_dry_run_is_repeatable_and_spawns_nothing() {
    let runner = ScriptedRunner::new(|_: &[String]| exit(2, "", "should not run"));
    let options = ProcessOptions {
        format: Some(OutputFormat::Mp3),
        mp3_bitrate: Some("320k".to_string()),
        dry_run: true,
        ..options_for(Path::new("out dir"))
    };

    let first = process_audio_file_with(&runner, Path::new("My Song.mp3"), &options).await;
    let second = process_audio_file_with(&runner, Path::new("My Song.mp3"), &options).await;

    assert!(first.success);
    assert_eq!(first, second);
    assert!(runner.calls().is_empty());

    let command = first.output.unwrap();
    assert_eq!(
        command,
        "conda run -n demucs --no-capture-output demucs -d cpu -n htdemucs -o 'out dir' --mp3 --mp3-bitrate 320 'My Song.mp3'"
    );
    assert!(!command.contains("320k"));
}

#[tokio::test]
async fn test_success_merges_instrumental() {
    let out = TempDir::new().unwrap();
    let runner = ScriptedRunner::new(separation_script(out.path().to_path_buf(), &["drums", "bass", "other", "vocals"], 0));

    let result = process_audio_file_with(&runner, Path::new("music/song.mp3"), &options_for(out.path())).await;

    assert!(result.success);
    let expected = out.path().join("htdemucs").join("song").join("instrumental.wav");
    assert_eq!(result.instrumental.as_deref(), Some(expected.as_path()));

    let merges = runner.env_calls("ffmpeg");
    assert_eq!(merges.len(), 1);
    let merge = &merges[0];
    assert_eq!(merge.last().map(PathBuf::from), Some(expected));
    assert!(merge.contains(&"-y".to_string()));
    assert!(merge.contains(&"[0:a][1:a][2:a]amix=inputs=3:duration=longest:dropout_transition=2[aout]".to_string()));
    // vocals are never part of the instrumental
    assert!(!merge.iter().any(|a| a.ends_with("vocals.wav")));
}

#[tokio::test]
async fn test_separation_failure_reports_stderr_and_skips_merge() {
    let runner = ScriptedRunner::new(|argv: &[String]| match env_command(argv) {
        Some("demucs") => exit(1, "loading model", "CUDA error"),
        _ => ok(""),
    });
    let out = TempDir::new().unwrap();

    let result = process_audio_file_with(&runner, Path::new("song.mp3"), &options_for(out.path())).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("CUDA error"));
    assert!(runner.env_calls("ffmpeg").is_empty());
}

#[tokio::test]
async fn test_separation_failure_falls_back_to_stdout() {
    let runner = ScriptedRunner::new(|_: &[String]| exit(1, "Model not found", ""));

    let result = process_audio_file_with(&runner, Path::new("song.mp3"), &ProcessOptions::default()).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Model not found"));
}

#[tokio::test]
async fn test_missing_stem_skips_merge_but_succeeds() {
    let out = TempDir::new().unwrap();
    let runner = ScriptedRunner::new(separation_script(out.path().to_path_buf(), &["drums", "bass", "vocals"], 0));

    let result = process_audio_file_with(&runner, Path::new("song.mp3"), &options_for(out.path())).await;

    assert!(result.success);
    assert!(result.instrumental.is_none());
    assert!(runner.env_calls("ffmpeg").is_empty());
}

#[tokio::test]
async fn test_merge_failure_does_not_fail_file() {
    let out = TempDir::new().unwrap();
    let runner = ScriptedRunner::new(separation_script(out.path().to_path_buf(), &["drums", "bass", "other"], 1));

    let result = process_audio_file_with(&runner, Path::new("song.mp3"), &options_for(out.path())).await;

    assert!(result.success);
    assert!(result.error.is_none());
    assert!(result.instrumental.is_none());
    assert_eq!(runner.env_calls("ffmpeg").len(), 1);
}

#[tokio::test]
async fn test_spawn_failure_becomes_failed_result() {
    let runner = ScriptedRunner::new(|argv: &[String]| spawn_error(&argv[0]));

    let result = process_audio_file_with(&runner, Path::new("song.mp3"), &ProcessOptions::default()).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Failed to start 'conda'"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_non_utf8_paths_reach_demucs_and_ffmpeg_unchanged() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let out = TempDir::new().unwrap();
    let track_dir = out.path().join("htdemucs").join(OsStr::from_bytes(b"caf\xe9"));
    fs::create_dir_all(&track_dir).unwrap();
    for stem in ["drums", "bass", "other"] {
        fs::write(track_dir.join(format!("{stem}.wav")), b"RIFF").unwrap();
    }
    let runner = ScriptedRunner::new(|_: &[String]| ok(""));
    let input = Path::new(OsStr::from_bytes(b"music/caf\xe9.mp3"));

    let result = process_audio_file_with(&runner, input, &options_for(out.path())).await;

    assert!(result.success);
    let expected = track_dir.join("instrumental.wav");
    assert_eq!(result.instrumental.as_deref(), Some(expected.as_path()));

    let raw = runner.raw_args.borrow();
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0].last().map(|a| a.as_os_str()), Some(input.as_os_str()));
    assert_eq!(raw[1].last().map(|a| a.as_os_str()), Some(expected.as_os_str()));
}

#[tokio::test]
async fn test_merge_with_missing_input_does_not_spawn() {
    let dir = TempDir::new().unwrap();
    let present = dir.path().join("drums.wav");
    fs::write(&present, b"RIFF").unwrap();
    let absent = dir.path().join("bass.wav");
    let runner = ScriptedRunner::new(|_: &[String]| ok(""));

    let err = merge_audio_files(
        &runner,
        &[present.as_path(), absent.as_path()],
        &dir.path().join("instrumental.wav"),
        "demucs",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DemucsCliError::MergeInputMissing(p) if p == absent));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_merge_failure_surfaces_stderr_or_generic_message() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("drums.wav");
    fs::write(&input, b"RIFF").unwrap();
    let output = dir.path().join("instrumental.wav");

    let noisy = ScriptedRunner::new(|_: &[String]| exit(1, "", "Invalid data found"));
    let err = merge_audio_files(&noisy, &[input.as_path()], &output, "demucs").await.unwrap_err();
    assert!(err.to_string().contains("Invalid data found"));

    let silent = ScriptedRunner::new(|_: &[String]| exit(1, "", ""));
    let err = merge_audio_files(&silent, &[input.as_path()], &output, "demucs").await.unwrap_err();
    assert!(err.to_string().contains("ffmpeg merge failed"));
}

// =============================================================================
// Batch orchestration
// =============================================================================

fn numbered_files(n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| PathBuf::from(format!("track{i}.mp3"))).collect()
}

#[tokio::test(start_paused = true)]
async fn test_grouped_batch_bounds_concurrency_and_keeps_order() {
    // Later files finish first within each group
    let runner = ScriptedRunner::new(|argv: &[String]| {
        let input = argv.last().unwrap();
        let index: u64 = input
            .trim_start_matches("track")
            .trim_end_matches(".mp3")
            .parse()
            .unwrap();
        Ok(Reply {
            output: CommandOutput {
                exit_code: if index == 4 { 1 } else { 0 },
                stdout: String::new(),
                stderr: format!("failed {input}"),
            },
            delay: Duration::from_millis(100 - index * 10),
        })
    });
    let files = numbered_files(7);
    let options = ProcessOptions {
        concurrency: 3,
        ..ProcessOptions::default()
    };
    let mut reporter = RecordingReporter::default();

    let batch = process_audio_files_with(&runner, &files, &options, &mut reporter).await;

    assert_eq!(reporter.group_sizes, [3, 3, 1]);
    assert_eq!(runner.peak.get(), 3);
    assert_eq!(batch.results.len(), 7);
    let order: Vec<PathBuf> = batch.results.iter().map(|r| r.file.clone()).collect();
    assert_eq!(order, files);

    assert!(!batch.success);
    assert_eq!(batch.failed(), 1);
    assert_eq!(batch.results[4].result.error.as_deref(), Some("failed track4.mp3"));
    // a failure does not stop later groups
    assert!(batch.results[6].success());
}

#[tokio::test(start_paused = true)]
async fn test_sequential_batch_reports_each_file_before_next() {
    let runner = ScriptedRunner::new(|_: &[String]| {
        Ok(Reply {
            output: CommandOutput::default(),
            delay: Duration::from_millis(20),
        })
    });
    let files = numbered_files(3);
    let mut reporter = RecordingReporter::default();

    let batch = process_audio_files_with(&runner, &files, &ProcessOptions::default(), &mut reporter).await;

    assert!(batch.success);
    assert_eq!(runner.peak.get(), 1);
    assert_eq!(
        reporter.events,
        ["start 0", "finish 0 ok", "start 1", "finish 1 ok", "start 2", "finish 2 ok"]
    );
    // no -j flag for sequential runs
    assert!(runner.calls().iter().all(|argv| !argv.contains(&"-j".to_string())));
}

#[tokio::test]
async fn test_batch_continues_after_spawn_failure() {
    let runner = ScriptedRunner::new(|argv: &[String]| {
        if argv.last().map(String::as_str) == Some("track1.mp3") {
            spawn_error("conda")
        } else {
            ok("")
        }
    });
    let files = numbered_files(3);

    let batch = process_audio_files_with(&runner, &files, &ProcessOptions::default(), &mut NoopReporter).await;

    assert!(!batch.success);
    assert_eq!(batch.results.len(), 3);
    assert!(batch.results[0].success());
    assert!(!batch.results[1].success());
    assert!(batch.results[2].success());
}

#[tokio::test]
async fn test_grouped_batch_forwards_jobs_flag() {
    let runner = ScriptedRunner::new(|_: &[String]| ok(""));
    let options = ProcessOptions {
        concurrency: 2,
        ..ProcessOptions::default()
    };

    process_audio_files_with(&runner, &numbered_files(2), &options, &mut NoopReporter).await;

    for argv in runner.env_calls("demucs") {
        let j = argv.iter().position(|a| a == "-j").unwrap();
        assert_eq!(argv[j + 1], "2");
    }
}

#[tokio::test]
async fn test_empty_batch_succeeds_without_spawning() {
    let runner = ScriptedRunner::new(|_: &[String]| ok(""));

    let batch = process_audio_files_with(&runner, &[], &ProcessOptions::default(), &mut NoopReporter).await;

    assert!(batch.success);
    assert!(batch.results.is_empty());
    assert!(runner.calls().is_empty());
}
