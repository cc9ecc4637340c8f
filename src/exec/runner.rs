//! External command execution
//!
//! Every subprocess goes through [`CommandRunner`]. The real implementation
//! spawns with tokio; tests substitute scripted doubles.

use crate::error::{DemucsCliError, Result};
use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, trace};

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, -1 if the process was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Build the argv that runs `command` inside a conda environment
pub fn env_invocation(manager: &str, env_name: &str, command: &str, args: &[OsString]) -> Vec<OsString> {
    let mut argv: Vec<OsString> = [manager, "run", "-n", env_name, "--no-capture-output", command]
        .into_iter()
        .map(OsString::from)
        .collect();
    argv.extend(args.iter().cloned());
    argv
}

/// Render argv for logs and previews; non-UTF-8 bytes are replaced
pub fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs external programs and captures their output.
///
/// A non-zero exit is a normal [`CommandOutput`]; only failures to start or
/// finish the process are errors. Arguments are `OsString` so paths reach
/// the child byte for byte.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Environment manager executable, e.g. "conda"
    fn manager_program(&self) -> &str;

    /// Run `program` directly
    async fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput>;

    /// Run `command` inside the named environment
    async fn run_in_env(&self, env_name: &str, command: &str, args: &[OsString]) -> Result<CommandOutput> {
        let argv = env_invocation(self.manager_program(), env_name, command, args);
        self.run(self.manager_program(), &argv[1..]).await
    }
}

/// Runner that spawns real processes.
///
/// On unix each child leads its own process group. `conda run` forks the
/// real tool, so a timeout or cancellation kills the whole group rather
/// than only the wrapper.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    manager: String,
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(manager: impl Into<String>) -> Self {
        Self {
            manager: manager.into(),
            timeout: None,
        }
    }

    /// Kill any command still running after `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new("conda")
    }
}

impl CommandRunner for SystemRunner {
    fn manager_program(&self) -> &str {
        &self.manager
    }

    async fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput> {
        debug!("Running: {} {}", program, display_args(args));

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| DemucsCliError::spawn_failure(program, e))?;
        let mut group = GroupGuard::new(child.id());

        let finished = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, collect_output(&mut child)).await {
                Ok(finished) => finished,
                Err(_) => {
                    drop(group);
                    if let Err(e) = child.kill().await {
                        debug!("Reaping {} after timeout: {}", program, e);
                    }
                    return Err(DemucsCliError::Timeout {
                        program: program.to_string(),
                        seconds: limit.as_secs(),
                    });
                }
            },
            None => collect_output(&mut child).await,
        };
        group.disarm();

        let (status, stdout, stderr) = finished.map_err(|e| DemucsCliError::spawn_failure(program, e))?;
        let result = CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };
        trace!("{} exited with {}", program, result.exit_code);

        Ok(result)
    }
}

/// Wait for exit while draining both pipes
async fn collect_output(child: &mut Child) -> std::io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let stdout = async {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, std::io::Error>(buf)
    };
    let stderr = async {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, std::io::Error>(buf)
    };

    tokio::try_join!(child.wait(), stdout, stderr)
}

/// Kills a child's process group when dropped while still armed.
///
/// Dropping the future that owns a running command (timeout, Ctrl-C) thus
/// also takes down everything the command forked.
struct GroupGuard {
    leader: Option<u32>,
}

impl GroupGuard {
    fn new(leader: Option<u32>) -> Self {
        Self { leader }
    }

    fn disarm(&mut self) {
        self.leader = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        let Some(leader) = self.leader.take() else {
            return;
        };
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if let Err(e) = killpg(Pid::from_raw(leader as i32), Signal::SIGKILL) {
                debug!("Could not kill process group {}: {}", leader, e);
            }
        }
        #[cfg(not(unix))]
        let _ = leader;
    }
}
