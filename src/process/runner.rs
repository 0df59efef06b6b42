//! Time-limited command execution.

use super::{CommandOutput, ProcessError, StructuredCommand};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;

/// Runs structured commands under a time limit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        command: &StructuredCommand,
        limit: Duration,
    ) -> Result<CommandOutput, ProcessError>;
}

/// Runs commands on the host via [`run_bounded`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        command: &StructuredCommand,
        limit: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        run_bounded(command, limit).await
    }
}

/// Run `command`, collecting stdout, stderr and the exit code, for at most
/// `limit`.
///
/// On expiry the child is killed and reaped before
/// [`ProcessError::Timeout`] is returned. Dropping the returned future also
/// kills the child.
pub async fn run_bounded(
    command: &StructuredCommand,
    limit: Duration,
) -> Result<CommandOutput, ProcessError> {
    tracing::debug!(%command, ?limit, "running");

    let mut child = Command::new(resolve_program(&command.program))
        .args(&command.args)
        .envs(command.env_vars.iter().cloned())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ProcessError::from_io(&command.program, &e))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let collected = timeout(limit, async {
        let (status, (out, err)) = futures::join!(
            child.wait(),
            futures::future::join(read_pipe(stdout), read_pipe(stderr))
        );
        status.map(|status| (status, out, err))
    })
    .await;

    match collected {
        Ok(Ok((status, out, err))) => Ok(CommandOutput {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
        }),
        Ok(Err(e)) => Err(ProcessError::from_io(&command.program, &e)),
        Err(_) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(program = %command.program, error = %e, "failed to kill timed-out process");
            }
            Err(ProcessError::Timeout {
                program: command.program.clone(),
                after: limit,
            })
        }
    }
}

/// Resolve bare program names through PATH so Windows shims (`npm.cmd`)
/// are found. Unresolvable names are passed through and fail at spawn.
fn resolve_program(program: &str) -> PathBuf {
    which::which(program).unwrap_or_else(|_| PathBuf::from(program))
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "pipe read ended early");
        }
    }
    buf
}
