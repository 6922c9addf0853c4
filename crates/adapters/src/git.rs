// SPDX-License-Identifier: MIT

//! Git worktree driver.
//!
//! Worktrees give each session an isolated checkout sharing the object
//! store with the main clone. All invocations scrub `GIT_DIR` /
//! `GIT_WORK_TREE` so behavior does not depend on the caller's hook
//! environment.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

use crate::subprocess::{self, run_ok, run_with_timeout, GIT_TIMEOUT};

#[derive(Debug, Error)]
pub enum GitError {
    #[error("'{0}' is not inside a git work tree")]
    NotARepo(String),

    #[error("worktree operation failed: {0}")]
    WorktreeFailed(String),

    #[error("git failed: {0}")]
    CommandFailed(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<subprocess::SubprocessError> for GitError {
    fn from(e: subprocess::SubprocessError) -> Self {
        GitError::CommandFailed(e.to_string())
    }
}

impl From<GitError> for wt_core::Error {
    fn from(e: GitError) -> Self {
        match e {
            GitError::NotARepo(path) => wt_core::Error::NotAGitRepo(path),
            GitError::WorktreeFailed(msg) => wt_core::Error::WorktreeFailed(msg),
            GitError::CommandFailed(msg) => wt_core::Error::WorktreeFailed(msg),
            GitError::Io(e) => wt_core::Error::Io(e),
        }
    }
}

fn git(repo: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    cmd
}

/// Does `branch` exist as a local head?
pub async fn local_branch_exists(repo: &Path, branch: &str) -> Result<bool, GitError> {
    let mut cmd = git(repo);
    cmd.args(["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")]);
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git show-ref").await?;
    Ok(output.status.success())
}

/// Does `branch` exist on origin?
pub async fn remote_branch_exists(repo: &Path, branch: &str) -> Result<bool, GitError> {
    let mut cmd = git(repo);
    cmd.args(["show-ref", "--verify", "--quiet", &format!("refs/remotes/origin/{branch}")]);
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git show-ref").await?;
    Ok(output.status.success())
}

/// Create a worktree for `branch` at `worktree`.
///
/// An existing branch (local or origin) is checked out; otherwise a new
/// branch of that name is created at HEAD.
pub async fn create(repo: &Path, worktree: &Path, branch: &str) -> Result<(), GitError> {
    if let Some(parent) = worktree.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let exists =
        local_branch_exists(repo, branch).await? || remote_branch_exists(repo, branch).await?;

    let mut cmd = git(repo);
    cmd.arg("worktree").arg("add");
    if !exists {
        cmd.arg("-b").arg(branch);
    }
    cmd.arg(worktree);
    if exists {
        cmd.arg(branch);
    }
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git worktree add").await?;
    if !output.status.success() {
        return Err(GitError::WorktreeFailed(subprocess::stderr_line(&output)));
    }
    Ok(())
}

/// Like `create`, but the new branch starts at `base_branch` instead of
/// HEAD.
pub async fn create_from_branch(
    repo: &Path,
    worktree: &Path,
    new_branch: &str,
    base_branch: &str,
) -> Result<(), GitError> {
    if let Some(parent) = worktree.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut cmd = git(repo);
    cmd.arg("worktree")
        .arg("add")
        .arg("-b")
        .arg(new_branch)
        .arg(worktree)
        .arg(base_branch);
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git worktree add").await?;
    if !output.status.success() {
        return Err(GitError::WorktreeFailed(subprocess::stderr_line(&output)));
    }
    Ok(())
}

/// Remove a worktree, falling back to a recursive directory delete when
/// git refuses (e.g. the registration is already gone).
pub async fn remove(worktree: &Path) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.arg("worktree")
        .arg("remove")
        .arg("--force")
        .arg(worktree)
        .current_dir(worktree)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE");
    match run_with_timeout(cmd, GIT_TIMEOUT, "git worktree remove").await {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            tracing::warn!(
                worktree = %worktree.display(),
                stderr = %subprocess::stderr_line(&output),
                "git worktree remove failed, deleting directory"
            );
        }
        Err(e) => {
            tracing::warn!(worktree = %worktree.display(), error = %e, "git worktree remove failed");
        }
    }
    if worktree.exists() {
        tokio::fs::remove_dir_all(worktree).await?;
    }
    Ok(())
}

/// Drop stale worktree registrations in `repo`.
pub async fn prune(repo: &Path) -> Result<(), GitError> {
    let mut cmd = git(repo);
    cmd.args(["worktree", "prune"]);
    run_ok(cmd, GIT_TIMEOUT, "git worktree prune").await?;
    Ok(())
}

/// Share the repo's `.claude` directory into the worktree via symlink.
/// No-op when the repo has none or the worktree already has one.
pub fn symlink_claude_dir(repo: &Path, worktree: &Path) -> Result<(), GitError> {
    let source = repo.join(".claude");
    let target = worktree.join(".claude");
    if !source.exists() || target.exists() {
        return Ok(());
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(&source, &target)?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_dir(&source, &target)?;
    Ok(())
}

/// True iff `branch` is an ancestor of `target`.
pub async fn is_branch_merged(repo: &Path, branch: &str, target: &str) -> Result<bool, GitError> {
    let mut cmd = git(repo);
    cmd.args(["merge-base", "--is-ancestor", branch, target]);
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git merge-base").await?;
    Ok(output.status.success())
}

/// Top level of the work tree enclosing `dir`.
pub async fn find_git_root(dir: &Path) -> Result<PathBuf, GitError> {
    let mut cmd = git(dir);
    cmd.args(["rev-parse", "--show-toplevel"]);
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git rev-parse").await?;
    if !output.status.success() {
        return Err(GitError::NotARepo(dir.display().to_string()));
    }
    Ok(PathBuf::from(subprocess::stdout_trimmed(&output)))
}

/// `origin` remote URL, empty when the repo has no origin.
pub async fn origin_url(repo: &Path) -> Result<String, GitError> {
    let mut cmd = git(repo);
    cmd.args(["remote", "get-url", "origin"]);
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git remote get-url").await?;
    if !output.status.success() {
        return Ok(String::new());
    }
    Ok(subprocess::stdout_trimmed(&output))
}

/// Main repository root for a worktree: the parent of its
/// `--git-common-dir`.
pub async fn main_repo_root(worktree: &Path) -> Result<PathBuf, GitError> {
    let mut cmd = git(worktree);
    cmd.args(["rev-parse", "--path-format=absolute", "--git-common-dir"]);
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git rev-parse").await?;
    if !output.status.success() {
        return Err(GitError::NotARepo(worktree.display().to_string()));
    }
    let common = PathBuf::from(subprocess::stdout_trimmed(&output));
    common
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| GitError::CommandFailed("git common dir has no parent".into()))
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
