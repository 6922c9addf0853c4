// SPDX-License-Identifier: MIT

//! User-facing error kinds shared across the wt layers.

use thiserror::Error;

/// Errors surfaced to the user by orchestrator operations.
///
/// Drivers wrap their native subprocess stderr in the message; the
/// orchestrator maps driver errors into these kinds so the CLI can print a
/// single actionable line.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not inside a wt session worktree")]
    NotInSession,

    #[error("session '{0}' already exists")]
    SessionExists(String),

    #[error("bead '{0}' not found in the issue store")]
    BeadNotFound(String),

    #[error("bead '{bead}' already has an active session '{session}'")]
    BeadInUse { bead: String, session: String },

    #[error("project '{0}' is not registered")]
    ProjectNotFound(String),

    #[error("project '{0}' is already registered")]
    ExistingProject(String),

    #[error("repo '{url}' branch '{branch}' is already registered as project '{existing}'")]
    RepoBranchConflict {
        url: String,
        branch: String,
        existing: String,
    },

    #[error("projects for '{url}' use bead prefix '{expected}', got '{got}'")]
    BeadPrefixMismatch {
        url: String,
        expected: String,
        got: String,
    },

    #[error("'{0}' is not inside a git work tree")]
    NotAGitRepo(String),

    #[error("worktree operation failed: {0}")]
    WorktreeFailed(String),

    #[error("no multiplexer server reachable: {0}")]
    MultiplexerUnavailable(String),

    #[error("multiplexer session '{0}' is missing")]
    MultiplexerSessionMissing(String),

    #[error("editor in session '{0}' did not become ready")]
    EditorNotReady(String),

    #[error("no free port offset available")]
    PortExhausted,

    #[error("merge hit a conflict: {0}")]
    MergeConflict(String),

    #[error("merge failed: {0}")]
    MergeFailed(String),

    #[error("pull request creation failed: {0}")]
    PRCreateFailed(String),

    #[error("worktree has uncommitted changes")]
    UncommittedChanges,

    #[error("health check did not pass within {0} seconds")]
    HealthCheckTimeout(u64),

    #[error("hook '{hook}' failed: {reason}")]
    HookFailed { hook: String, reason: String },

    #[error("name pool for theme '{0}' is exhausted")]
    PoolExhausted(String),

    #[error("completion condition not met: {0}")]
    ConditionUnmet(String),

    #[error("auto runner: {0}")]
    AutoFailed(String),

    #[error("state file corrupt: {0}")]
    StateCorrupt(String),

    #[error("issue store command failed: {0}")]
    IssueStoreFailed(String),

    #[error("required external command '{0}' is missing")]
    ExternalCliMissing(String),

    #[error("invalid status '{0}' (expected working, ready, blocked, error or idle)")]
    InvalidStatus(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
