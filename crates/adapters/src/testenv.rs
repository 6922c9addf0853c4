// SPDX-License-Identifier: MIT

//! Test-environment driver: port-offset sandboxes and project hooks.
//!
//! Setup, teardown, health checks and hooks are plain shell commands run
//! in the worktree with the project's port env var set.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use wt_core::{Project, TestEnv};

use crate::subprocess::{self, run_with_timeout, HOOK_TIMEOUT};

/// First candidate port offset.
const OFFSET_BASE: u16 = 1000;
/// Spacing between sandboxes, leaving room for a service port block each.
const OFFSET_STEP: u16 = 100;
/// Health-check poll interval.
const HEALTH_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum TestEnvError {
    #[error("no free port offset available")]
    PortExhausted,

    #[error("health check did not pass within {0} seconds")]
    HealthTimeout(u64),

    #[error("hook '{hook}' failed: {reason}")]
    HookFailed { hook: String, reason: String },

    #[error("{label} failed: {reason}")]
    CommandFailed { label: String, reason: String },
}

impl From<TestEnvError> for wt_core::Error {
    fn from(e: TestEnvError) -> Self {
        match e {
            TestEnvError::PortExhausted => wt_core::Error::PortExhausted,
            TestEnvError::HealthTimeout(secs) => wt_core::Error::HealthCheckTimeout(secs),
            TestEnvError::HookFailed { hook, reason } => wt_core::Error::HookFailed { hook, reason },
            TestEnvError::CommandFailed { label, reason } => {
                wt_core::Error::HookFailed { hook: label, reason }
            }
        }
    }
}

/// Allocate a port offset for a new session: 0 when the project has no
/// test env, else the first free slot from 1000 upward in steps of 100.
pub fn allocate_port_offset(project: &Project, used: &HashSet<u16>) -> Result<u16, TestEnvError> {
    if project.test_env.is_none() {
        return Ok(0);
    }
    let mut offset = OFFSET_BASE;
    loop {
        if !used.contains(&offset) {
            return Ok(offset);
        }
        offset = offset.checked_add(OFFSET_STEP).ok_or(TestEnvError::PortExhausted)?;
    }
}

async fn run_shell(
    command: &str,
    worktree: &Path,
    port_env: (&str, u16),
    label: &str,
) -> Result<std::process::Output, TestEnvError> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(worktree)
        .env(port_env.0, port_env.1.to_string());
    run_with_timeout(cmd, HOOK_TIMEOUT, label)
        .await
        .map_err(|e| TestEnvError::CommandFailed { label: label.to_string(), reason: e.to_string() })
}

/// Run the test-env setup command, if configured.
pub async fn run_setup(
    env: &TestEnv,
    worktree: &Path,
    port_offset: u16,
) -> Result<(), TestEnvError> {
    let Some(setup) = &env.setup else { return Ok(()) };
    let output = run_shell(setup, worktree, (&env.port_env, port_offset), "test-env setup").await?;
    if !output.status.success() {
        return Err(TestEnvError::CommandFailed {
            label: "test-env setup".to_string(),
            reason: subprocess::stderr_line(&output),
        });
    }
    Ok(())
}

/// Run the test-env teardown command, if configured.
pub async fn run_teardown(
    env: &TestEnv,
    worktree: &Path,
    port_offset: u16,
) -> Result<(), TestEnvError> {
    let Some(teardown) = &env.teardown else { return Ok(()) };
    let output =
        run_shell(teardown, worktree, (&env.port_env, port_offset), "test-env teardown").await?;
    if !output.status.success() {
        return Err(TestEnvError::CommandFailed {
            label: "test-env teardown".to_string(),
            reason: subprocess::stderr_line(&output),
        });
    }
    Ok(())
}

/// Poll the health-check command until it succeeds or the deadline passes.
pub async fn wait_for_healthy(
    env: &TestEnv,
    worktree: &Path,
    port_offset: u16,
    timeout: Duration,
) -> Result<(), TestEnvError> {
    let Some(health) = &env.health_check else { return Ok(()) };
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let output =
            run_shell(health, worktree, (&env.port_env, port_offset), "health check").await?;
        if output.status.success() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(TestEnvError::HealthTimeout(timeout.as_secs()));
        }
        tokio::time::sleep(HEALTH_POLL).await;
    }
}

/// Run a hook list in order; the first failing hook aborts the sequence.
pub async fn run_hooks(
    hooks: &[String],
    worktree: &Path,
    port_env: (&str, u16),
) -> Result<(), TestEnvError> {
    for hook in hooks {
        let output = run_shell(hook, worktree, port_env, "hook").await.map_err(|e| {
            TestEnvError::HookFailed { hook: hook.clone(), reason: e.to_string() }
        })?;
        if !output.status.success() {
            return Err(TestEnvError::HookFailed {
                hook: hook.clone(),
                reason: subprocess::stderr_line(&output),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "testenv_tests.rs"]
mod tests;
