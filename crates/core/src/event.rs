// SPDX-License-Identifier: MIT

//! Lifecycle events appended to the event log.
//!
//! Events are immutable once written. The log is newline-delimited JSON;
//! every record carries names, never object references, so the log can be
//! replayed against any state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::project::MergeMode;

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    SessionKill,
    HubHandoff,
    PrCreated,
    PrMerged,
}

/// One immutable record in the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// RFC 3339; non-decreasing by append order.
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub session: String,
    #[serde(default)]
    pub bead: String,
    #[serde(default)]
    pub project: String,
    /// Editor-internal session id, recorded so `seance` can resume it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_mode: Option<MergeMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<String>,
}

impl Event {
    pub fn new(
        timestamp: DateTime<Utc>,
        kind: EventKind,
        session: impl Into<String>,
        bead: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            session: session.into(),
            bead: bead.into(),
            project: project.into(),
            editor_session: None,
            merge_mode: None,
            pr_url: None,
            worktree: None,
        }
    }

    pub fn with_editor_session(mut self, id: impl Into<String>) -> Self {
        self.editor_session = Some(id.into());
        self
    }

    pub fn with_merge_mode(mut self, mode: MergeMode) -> Self {
        self.merge_mode = Some(mode);
        self
    }

    pub fn with_pr_url(mut self, url: impl Into<String>) -> Self {
        self.pr_url = Some(url.into());
        self
    }

    pub fn with_worktree(mut self, worktree: impl Into<String>) -> Self {
        self.worktree = Some(worktree.into());
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
