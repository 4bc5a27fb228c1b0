// Subprocess runner implementation
// reason: tokio::process for async wait, nix for graceful SIGTERM to the process group on unix
use async_trait::async_trait;
use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use pyeval_core::cancel::CancelToken;
use pyeval_core::constants::GRACEFUL_KILL_TIMEOUT;
use pyeval_core::port::{CommandSpec, ProcessOutput, ProcessRunner, RunError};

type Collected = (ExitStatus, Vec<u8>, Option<Vec<u8>>);

enum Outcome {
    Exited(std::io::Result<Collected>),
    Cancelled,
    TimedOut,
}

/// Subprocess runner
///
/// Spawns one child per call: stdin closed, stdout piped, stderr piped only
/// when capture is requested. The child inherits the working directory and,
/// unless an allowlist is given, the whole environment.
#[derive(Debug, Default, Clone)]
pub struct SubprocessRunner;

impl SubprocessRunner {
    pub fn new() -> Self {
        Self
    }

    fn build_command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if spec.capture_stderr {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            // Killed if this future is dropped mid-wait (abort, panic)
            .kill_on_drop(true);

        // Own process group, so stopping the script also reaches its children
        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(allowlist) = &spec.env_allowlist {
            cmd.env_clear()
                .envs(filter_env(allowlist, std::env::vars_os()));
        }

        cmd
    }

    /// Wait for exit while draining both pipes, so a chatty child cannot
    /// block on a full pipe buffer
    async fn collect(child: &mut Child) -> std::io::Result<Collected> {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (status, stdout, stderr) =
            tokio::try_join!(child.wait(), read_pipe(stdout), read_pipe(stderr))?;

        Ok((status, stdout.unwrap_or_default(), stderr))
    }

    /// Stop a child that is still running: SIGTERM to its process group
    /// first, SIGKILL for whatever is left. Always leaves the child reaped.
    async fn terminate(child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let group = Pid::from_raw(pid as i32);
            debug!(pid = %pid, "Sending SIGTERM to child process group");
            if let Err(e) = killpg(group, Signal::SIGTERM) {
                warn!(pid = %pid, error = %e, "SIGTERM failed");
            }

            match timeout(GRACEFUL_KILL_TIMEOUT, child.wait()).await {
                Ok(Ok(status)) => debug!(pid = %pid, status = %status, "Child exited after SIGTERM"),
                Ok(Err(e)) => warn!(pid = %pid, error = %e, "Waiting after SIGTERM failed"),
                Err(_) => warn!(pid = %pid, "Child did not exit after SIGTERM, sending SIGKILL"),
            }

            // Descendants that ignored SIGTERM
            match killpg(group, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!(pid = %pid, error = %e, "SIGKILL failed"),
            }
        }

        if let Ok(Some(_)) = child.try_wait() {
            return;
        }

        // kill() also waits, so the child is reaped here
        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill child process");
        }
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        mut cancel: CancelToken,
    ) -> Result<ProcessOutput, RunError> {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let start = Instant::now();
        let mut child = Self::build_command(spec)
            .spawn()
            .map_err(|e| RunError::SpawnFailed(e.to_string()))?;

        debug!(
            pid = ?child.id(),
            program = %spec.program,
            timeout_ms = ?spec.timeout.map(|t| t.as_millis()),
            "Spawned child process"
        );

        let outcome = tokio::select! {
            res = Self::collect(&mut child) => Outcome::Exited(res),
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = deadline(spec.timeout) => Outcome::TimedOut,
        };

        match outcome {
            Outcome::Exited(Ok((status, stdout, stderr))) => {
                debug!(
                    program = %spec.program,
                    exit_code = ?status.code(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    stdout_len = stdout.len(),
                    "Child process exited"
                );
                Ok(ProcessOutput {
                    success: status.success(),
                    exit_code: status.code(),
                    stdout,
                    stderr,
                })
            }
            Outcome::Exited(Err(e)) => {
                Self::terminate(&mut child).await;
                Err(RunError::Io(e.to_string()))
            }
            Outcome::Cancelled => {
                Self::terminate(&mut child).await;
                Err(RunError::Cancelled)
            }
            Outcome::TimedOut => {
                Self::terminate(&mut child).await;
                let timeout_ms = spec.timeout.map(|t| t.as_millis() as u64).unwrap_or(0);
                Err(RunError::Timeout(timeout_ms))
            }
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Option<Vec<u8>>> {
    match pipe {
        Some(mut pipe) => {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).await?;
            Ok(Some(buf))
        }
        None => Ok(None),
    }
}

async fn deadline(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending::<()>().await,
    }
}

/// Keep only allowlisted variables
fn filter_env(
    allowlist: &[String],
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> Vec<(OsString, OsString)> {
    vars.into_iter()
        .filter(|(k, _)| {
            k.to_str()
                .map(|k| allowlist.iter().any(|allowed| allowed == k))
                .unwrap_or(false)
        })
        .collect()
}
