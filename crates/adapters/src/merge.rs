// SPDX-License-Identifier: MIT

//! Merge driver: direct merges via git, pull requests via the `gh` CLI.
//!
//! Conflict and non-fast-forward states surface as `Conflict`; whether to
//! rebase is the orchestrator's call, driven by the project's auto-rebase
//! policy.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

use crate::git;
use crate::subprocess::{self, run_with_timeout, GH_TIMEOUT, GIT_TIMEOUT};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("merge hit a conflict: {0}")]
    Conflict(String),

    #[error("merge failed: {0}")]
    Failed(String),

    #[error("pull request creation failed: {0}")]
    PrCreateFailed(String),

    #[error("gh failed: {0}")]
    GhFailed(String),
}

impl From<MergeError> for wt_core::Error {
    fn from(e: MergeError) -> Self {
        match e {
            MergeError::Conflict(msg) => wt_core::Error::MergeConflict(msg),
            MergeError::Failed(msg) => wt_core::Error::MergeFailed(msg),
            MergeError::PrCreateFailed(msg) => wt_core::Error::PRCreateFailed(msg),
            MergeError::GhFailed(msg) => wt_core::Error::MergeFailed(msg),
        }
    }
}

impl From<git::GitError> for MergeError {
    fn from(e: git::GitError) -> Self {
        MergeError::Failed(e.to_string())
    }
}

/// Pull-request state as reported by `gh pr view --json state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    Open,
    Merged,
    Closed,
}

#[async_trait]
pub trait MergeDriver: Send + Sync + 'static {
    async fn has_uncommitted_changes(&self, worktree: &Path) -> Result<bool, MergeError>;

    async fn current_branch(&self, worktree: &Path) -> Result<String, MergeError>;

    /// Is the branch fully pushed (not ahead of its upstream)?
    async fn is_pushed(&self, worktree: &Path) -> Result<bool, MergeError>;

    /// Push, then no-ff merge `branch` into `default_branch` in the main
    /// repository, then best-effort delete the branch locally and on
    /// origin.
    async fn direct_merge(
        &self,
        worktree: &Path,
        branch: &str,
        default_branch: &str,
    ) -> Result<(), MergeError>;

    /// Rebase the worktree's branch onto origin's default branch, for the
    /// auto-rebase recovery path.
    async fn rebase_onto_default(
        &self,
        worktree: &Path,
        default_branch: &str,
    ) -> Result<(), MergeError>;

    /// Push and open a PR; returns the PR URL. An already-existing PR is
    /// not an error; its URL is retrieved instead.
    async fn create_pr(
        &self,
        worktree: &Path,
        branch: &str,
        default_branch: &str,
        title: &str,
    ) -> Result<String, MergeError>;

    async fn enable_auto_merge(&self, worktree: &Path, pr_url: &str) -> Result<(), MergeError>;

    async fn pr_state(&self, worktree: &Path, pr_ref: &str) -> Result<PrState, MergeError>;
}

/// Production driver: git subprocesses plus the GitHub CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct GhMergeDriver;

impl GhMergeDriver {
    pub fn new() -> Self {
        Self
    }
}

fn git_in(dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    cmd
}

fn classify_merge_failure(stderr: &str) -> MergeError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("conflict")
        || lowered.contains("non-fast-forward")
        || lowered.contains("fetch first")
        || lowered.contains("automatic merge failed")
        || lowered.contains("not possible to fast-forward")
    {
        MergeError::Conflict(stderr.to_string())
    } else {
        MergeError::Failed(stderr.to_string())
    }
}

async fn run_git(dir: &Path, args: &[&str], label: &str) -> Result<std::process::Output, MergeError> {
    let mut cmd = git_in(dir);
    cmd.args(args);
    let output = run_with_timeout(cmd, GIT_TIMEOUT, label)
        .await
        .map_err(|e| MergeError::Failed(e.to_string()))?;
    if !output.status.success() {
        return Err(classify_merge_failure(&subprocess::stderr_line(&output)));
    }
    Ok(output)
}

async fn run_gh(dir: &Path, args: &[&str], label: &str) -> Result<std::process::Output, MergeError> {
    let mut cmd = Command::new("gh");
    cmd.args(args).current_dir(dir);
    run_with_timeout(cmd, GH_TIMEOUT, label).await.map_err(|e| MergeError::GhFailed(e.to_string()))
}

/// Resolve the main repository root from a worktree.
async fn main_root(worktree: &Path) -> Result<PathBuf, MergeError> {
    Ok(git::main_repo_root(worktree).await?)
}

#[async_trait]
impl MergeDriver for GhMergeDriver {
    async fn has_uncommitted_changes(&self, worktree: &Path) -> Result<bool, MergeError> {
        let output = run_git(worktree, &["status", "--porcelain"], "git status").await?;
        Ok(!subprocess::stdout_trimmed(&output).is_empty())
    }

    async fn current_branch(&self, worktree: &Path) -> Result<String, MergeError> {
        let output =
            run_git(worktree, &["rev-parse", "--abbrev-ref", "HEAD"], "git rev-parse").await?;
        Ok(subprocess::stdout_trimmed(&output))
    }

    async fn is_pushed(&self, worktree: &Path) -> Result<bool, MergeError> {
        let output = run_git(worktree, &["status", "-sb"], "git status").await?;
        let head_line = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(!head_line.contains("ahead"))
    }

    async fn direct_merge(
        &self,
        worktree: &Path,
        branch: &str,
        default_branch: &str,
    ) -> Result<(), MergeError> {
        run_git(worktree, &["push", "-u", "origin", branch], "git push").await?;

        let root = main_root(worktree).await?;
        run_git(&root, &["checkout", default_branch], "git checkout").await?;
        run_git(&root, &["pull", "--ff-only"], "git pull").await?;
        run_git(
            &root,
            &["merge", "--no-ff", branch, "-m", &format!("Merge branch '{branch}'")],
            "git merge",
        )
        .await?;
        run_git(&root, &["push"], "git push").await?;

        // Best-effort branch cleanup; a missing remote branch is fine.
        if let Err(e) = run_git(&root, &["push", "origin", "--delete", branch], "git push").await {
            tracing::warn!(branch, error = %e, "remote branch delete failed");
        }
        if let Err(e) = run_git(&root, &["branch", "-d", branch], "git branch").await {
            tracing::warn!(branch, error = %e, "local branch delete failed");
        }
        Ok(())
    }

    async fn rebase_onto_default(
        &self,
        worktree: &Path,
        default_branch: &str,
    ) -> Result<(), MergeError> {
        run_git(worktree, &["fetch", "origin", default_branch], "git fetch").await?;
        let result = run_git(
            worktree,
            &["rebase", &format!("origin/{default_branch}")],
            "git rebase",
        )
        .await;
        if result.is_err() {
            // Leave the tree clean for the user to retry by hand.
            let _ = run_git(worktree, &["rebase", "--abort"], "git rebase --abort").await;
        }
        result.map(|_| ())
    }

    async fn create_pr(
        &self,
        worktree: &Path,
        branch: &str,
        default_branch: &str,
        title: &str,
    ) -> Result<String, MergeError> {
        run_git(worktree, &["push", "-u", "origin", branch], "git push").await?;

        let body = format!("Closes bead: {branch}");
        let output = run_gh(
            worktree,
            &[
                "pr",
                "create",
                "--base",
                default_branch,
                "--head",
                branch,
                "--title",
                title,
                "--body",
                &body,
            ],
            "gh pr create",
        )
        .await?;

        if output.status.success() {
            return Ok(subprocess::stdout_trimmed(&output));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stderr.contains("already exists") {
            let view = run_gh(
                worktree,
                &["pr", "view", branch, "--json", "url", "-q", ".url"],
                "gh pr view",
            )
            .await?;
            if view.status.success() {
                return Ok(subprocess::stdout_trimmed(&view));
            }
        }
        Err(MergeError::PrCreateFailed(subprocess::stderr_line(&output)))
    }

    async fn enable_auto_merge(&self, worktree: &Path, pr_url: &str) -> Result<(), MergeError> {
        let output = run_gh(
            worktree,
            &["pr", "merge", pr_url, "--auto", "--merge"],
            "gh pr merge",
        )
        .await?;
        if !output.status.success() {
            return Err(MergeError::GhFailed(subprocess::stderr_line(&output)));
        }
        Ok(())
    }

    async fn pr_state(&self, worktree: &Path, pr_ref: &str) -> Result<PrState, MergeError> {
        let output = run_gh(
            worktree,
            &["pr", "view", pr_ref, "--json", "state", "-q", ".state"],
            "gh pr view",
        )
        .await?;
        if !output.status.success() {
            return Err(MergeError::GhFailed(subprocess::stderr_line(&output)));
        }
        match subprocess::stdout_trimmed(&output).as_str() {
            "OPEN" => Ok(PrState::Open),
            "MERGED" => Ok(PrState::Merged),
            "CLOSED" => Ok(PrState::Closed),
            other => Err(MergeError::GhFailed(format!("unexpected PR state '{other}'"))),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{MergeDriver, MergeError, PrState};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::Arc;

    /// Recorded merge-driver operation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MergeCall {
        DirectMerge { branch: String, default_branch: String },
        Rebase { default_branch: String },
        CreatePr { branch: String, default_branch: String, title: String },
        EnableAutoMerge { pr_url: String },
    }

    #[derive(Default)]
    struct FakeState {
        calls: Vec<MergeCall>,
        dirty: bool,
        pushed: bool,
        branch: String,
        pr_url: String,
        pr_state: Option<PrState>,
        conflict_once: bool,
        fail_merge: bool,
    }

    /// Scriptable merge driver for engine tests.
    #[derive(Clone)]
    pub struct FakeMergeDriver {
        inner: Arc<Mutex<FakeState>>,
    }

    impl Default for FakeMergeDriver {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FakeMergeDriver {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeState {
                    pushed: true,
                    branch: "main".into(),
                    pr_url: "https://example.com/pr/1".into(),
                    pr_state: Some(PrState::Open),
                    ..FakeState::default()
                })),
            }
        }

        pub fn calls(&self) -> Vec<MergeCall> {
            self.inner.lock().calls.clone()
        }

        pub fn set_dirty(&self, dirty: bool) {
            self.inner.lock().dirty = dirty;
        }

        pub fn set_pushed(&self, pushed: bool) {
            self.inner.lock().pushed = pushed;
        }

        pub fn set_branch(&self, branch: &str) {
            self.inner.lock().branch = branch.to_string();
        }

        pub fn set_pr_url(&self, url: &str) {
            self.inner.lock().pr_url = url.to_string();
        }

        pub fn set_pr_state(&self, state: PrState) {
            self.inner.lock().pr_state = Some(state);
        }

        /// First direct_merge reports a conflict; later attempts succeed.
        pub fn conflict_once(&self) {
            self.inner.lock().conflict_once = true;
        }

        pub fn fail_merge(&self) {
            self.inner.lock().fail_merge = true;
        }
    }

    #[async_trait]
    impl MergeDriver for FakeMergeDriver {
        async fn has_uncommitted_changes(&self, _worktree: &Path) -> Result<bool, MergeError> {
            Ok(self.inner.lock().dirty)
        }

        async fn current_branch(&self, _worktree: &Path) -> Result<String, MergeError> {
            Ok(self.inner.lock().branch.clone())
        }

        async fn is_pushed(&self, _worktree: &Path) -> Result<bool, MergeError> {
            Ok(self.inner.lock().pushed)
        }

        async fn direct_merge(
            &self,
            _worktree: &Path,
            branch: &str,
            default_branch: &str,
        ) -> Result<(), MergeError> {
            let mut state = self.inner.lock();
            state.calls.push(MergeCall::DirectMerge {
                branch: branch.to_string(),
                default_branch: default_branch.to_string(),
            });
            if state.fail_merge {
                return Err(MergeError::Failed("scripted failure".into()));
            }
            if state.conflict_once {
                state.conflict_once = false;
                return Err(MergeError::Conflict("scripted conflict".into()));
            }
            Ok(())
        }

        async fn rebase_onto_default(
            &self,
            _worktree: &Path,
            default_branch: &str,
        ) -> Result<(), MergeError> {
            self.inner
                .lock()
                .calls
                .push(MergeCall::Rebase { default_branch: default_branch.to_string() });
            Ok(())
        }

        async fn create_pr(
            &self,
            _worktree: &Path,
            branch: &str,
            default_branch: &str,
            title: &str,
        ) -> Result<String, MergeError> {
            let mut state = self.inner.lock();
            state.calls.push(MergeCall::CreatePr {
                branch: branch.to_string(),
                default_branch: default_branch.to_string(),
                title: title.to_string(),
            });
            Ok(state.pr_url.clone())
        }

        async fn enable_auto_merge(
            &self,
            _worktree: &Path,
            pr_url: &str,
        ) -> Result<(), MergeError> {
            self.inner
                .lock()
                .calls
                .push(MergeCall::EnableAutoMerge { pr_url: pr_url.to_string() });
            Ok(())
        }

        async fn pr_state(&self, _worktree: &Path, _pr_ref: &str) -> Result<PrState, MergeError> {
            self.inner
                .lock()
                .pr_state
                .ok_or_else(|| MergeError::GhFailed("no PR".into()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMergeDriver, MergeCall};

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
