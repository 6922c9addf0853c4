// SPDX-License-Identifier: MIT

//! Shared subprocess execution with timeouts.
//!
//! Every external binary goes through here so no driver can hang the
//! orchestrator. Timeouts are generous; they exist to catch wedged
//! servers, not slow networks.

use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

pub const GIT_TIMEOUT: Duration = Duration::from_secs(120);
pub const GH_TIMEOUT: Duration = Duration::from_secs(120);
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(10);
pub const BD_TIMEOUT: Duration = Duration::from_secs(30);
pub const HOOK_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{label} timed out after {}s", timeout.as_secs())]
    Timeout { label: String, timeout: Duration },

    #[error("command '{program}' is missing")]
    Missing { program: String },

    #[error("failed to run {label}: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{label} failed: {stderr}")]
    Failed { label: String, stderr: String },
}

/// Run a command to completion, killing it if the timeout elapses.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SubprocessError> {
    cmd.kill_on_drop(true);
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let fut = cmd.output();
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SubprocessError::Missing { program })
        }
        Ok(Err(e)) => Err(SubprocessError::Spawn { label: label.to_string(), source: e }),
        Err(_) => Err(SubprocessError::Timeout { label: label.to_string(), timeout }),
    }
}

/// Like `run_with_timeout`, but a non-zero exit is an error carrying the
/// trimmed stderr.
pub async fn run_ok(
    cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SubprocessError> {
    let output = run_with_timeout(cmd, timeout, label).await?;
    if !output.status.success() {
        return Err(SubprocessError::Failed {
            label: label.to_string(),
            stderr: stderr_line(&output),
        });
    }
    Ok(output)
}

/// First meaningful line of stderr (falls back to stdout, then the exit
/// status) for one-line error messages.
pub fn stderr_line(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if let Some(line) = stderr.lines().find(|l| !l.trim().is_empty()) {
        return line.trim().to_string();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if let Some(line) = stdout.lines().find(|l| !l.trim().is_empty()) {
        return line.trim().to_string();
    }
    format!("exit status {}", output.status)
}

pub fn stdout_trimmed(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
