// SPDX-License-Identifier: MIT

//! Session records tracked in the session state store.
//!
//! A session couples one unit of work (a bead or a transient task) with an
//! isolated git worktree and a detached multiplexer session. Bead sessions
//! and task sessions share a header; the variant carries the task-only
//! fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Live status of a session, either signalled by the worker or derived from
/// multiplexer activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Working,
    Idle,
    Ready,
    Blocked,
    Error,
}

impl SessionStatus {
    /// Statuses a worker may set explicitly via `signal`.
    pub const ALL: [SessionStatus; 5] = [
        SessionStatus::Working,
        SessionStatus::Idle,
        SessionStatus::Ready,
        SessionStatus::Blocked,
        SessionStatus::Error,
    ];
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Working => "working",
            SessionStatus::Idle => "idle",
            SessionStatus::Ready => "ready",
            SessionStatus::Blocked => "blocked",
            SessionStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" => Ok(SessionStatus::Working),
            "idle" => Ok(SessionStatus::Idle),
            "ready" => Ok(SessionStatus::Ready),
            "blocked" => Ok(SessionStatus::Blocked),
            "error" => Ok(SessionStatus::Error),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// Condition under which a task session may complete via `done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionCondition {
    #[default]
    None,
    PrMerged,
    Pushed,
    TestsPass,
    UserConfirm,
}

impl FromStr for CompletionCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CompletionCondition::None),
            "pr-merged" => Ok(CompletionCondition::PrMerged),
            "pushed" => Ok(CompletionCondition::Pushed),
            "tests-pass" => Ok(CompletionCondition::TestsPass),
            "user-confirm" => Ok(CompletionCondition::UserConfirm),
            other => Err(format!("unknown completion condition '{other}'")),
        }
    }
}

/// The unit of work a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionKind {
    /// Tracked by the external issue store; branch name equals the bead id.
    Bead { bead: String },
    /// Transient unit with a user-chosen completion condition.
    Task {
        description: String,
        #[serde(default)]
        condition: CompletionCondition,
    },
}

/// One active session: worktree + multiplexer session + metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub project: String,
    pub worktree: PathBuf,
    pub branch: String,
    /// 0 means no test-env port sandbox was allocated.
    #[serde(default)]
    pub port_offset: u16,
    pub beads_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Unprefixed identifier drawn from the project's theme. Older state
    /// files may lack it; `used_names` falls back to the session name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_name: Option<String>,
    #[serde(flatten)]
    pub kind: SessionKind,
}

impl Session {
    /// Bead id for bead sessions, `None` for task sessions.
    pub fn bead(&self) -> Option<&str> {
        match &self.kind {
            SessionKind::Bead { bead } => Some(bead),
            SessionKind::Task { .. } => None,
        }
    }

    pub fn is_task(&self) -> bool {
        matches!(self.kind, SessionKind::Task { .. })
    }

    /// Completion condition for task sessions; bead sessions complete by
    /// merge + bead close.
    pub fn completion_condition(&self) -> Option<CompletionCondition> {
        match &self.kind {
            SessionKind::Task { condition, .. } => Some(*condition),
            SessionKind::Bead { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
