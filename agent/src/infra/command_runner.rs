//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill on all platforms.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::application::ports::CommandRunner;

/// Default timeout for shell, systemctl, and docker commands.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(300);

/// Production `CommandRunner`.
///
/// `tokio::time::timeout` around `.output().await` drops the future but
/// leaves the OS process running on Windows. This implementation races the
/// child against a sleep with `tokio::select!` and kills it explicitly.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

/// Read a captured pipe to the end. A pipe that errors mid-read yields what
/// was read so far.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "pipe closed early");
        }
    }
    buf
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(&self, program: &str, args: &[&str], timeout: Duration) -> Result<Output> {
        tracing::debug!(program = %program, ?args, "spawning");
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let finished = tokio::select! {
            done = async { tokio::join!(child.wait(), stdout, stderr) } => done,
            () = tokio::time::sleep(timeout) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(program = %program, error = %e, "kill after timeout failed");
                }
                tracing::warn!(program = %program, secs = timeout.as_secs(), "command timed out, killed");
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        };
        let (status, stdout, stderr) = finished;
        let status = status.with_context(|| format!("waiting for {program}"))?;
        if !status.success() {
            tracing::debug!(program = %program, %status, "command exited unsuccessfully");
        }
        Ok(Output { status, stdout, stderr })
    }
}

/// Fail with the process output unless it exited successfully.
///
/// # Errors
///
/// Returns an error carrying stderr (or stdout) when the exit status is non-zero.
pub fn ensure_success(program: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
    anyhow::bail!("{program} failed ({}): {detail}", output.status)
}
