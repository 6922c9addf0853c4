// SPDX-License-Identifier: MIT

//! Test builders shared by other crates' tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::project::{MergeMode, Project};
use crate::session::{CompletionCondition, Session, SessionKind, SessionStatus};

/// Fixed timestamp used by builders so fixtures compare stably.
pub fn fixture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap_or_default()
}

/// Builder for session fixtures.
pub struct SessionBuilder {
    session: Session,
}

impl SessionBuilder {
    pub fn bead(name: &str, bead: &str) -> Self {
        let t = fixture_time();
        Self {
            session: Session {
                name: name.to_string(),
                project: "demo".to_string(),
                worktree: format!("/tmp/worktrees/{name}").into(),
                branch: bead.to_string(),
                port_offset: 0,
                beads_dir: "/tmp/repo/.beads".into(),
                created_at: t,
                last_activity: t,
                status: SessionStatus::Working,
                status_message: None,
                theme_name: None,
                kind: SessionKind::Bead { bead: bead.to_string() },
            },
        }
    }

    pub fn task(name: &str, description: &str) -> Self {
        let mut builder = Self::bead(name, "");
        builder.session.branch = format!("task/{name}");
        builder.session.kind = SessionKind::Task {
            description: description.to_string(),
            condition: CompletionCondition::None,
        };
        builder
    }

    pub fn project(mut self, project: &str) -> Self {
        self.session.project = project.to_string();
        self
    }

    pub fn worktree(mut self, worktree: &str) -> Self {
        self.session.worktree = worktree.into();
        self
    }

    pub fn theme_name(mut self, theme_name: &str) -> Self {
        self.session.theme_name = Some(theme_name.to_string());
        self
    }

    pub fn port_offset(mut self, offset: u16) -> Self {
        self.session.port_offset = offset;
        self
    }

    pub fn status(mut self, status: SessionStatus) -> Self {
        self.session.status = status;
        self
    }

    pub fn condition(mut self, condition: CompletionCondition) -> Self {
        if let SessionKind::Task { condition: c, .. } = &mut self.session.kind {
            *c = condition;
        }
        self
    }

    pub fn build(self) -> Session {
        self.session
    }
}

/// Project fixture with the given merge mode.
pub fn project_fixture(name: &str, merge_mode: MergeMode) -> Project {
    let mut project = Project::new(name, format!("/tmp/{name}"));
    project.bead_prefix = name
        .chars()
        .take(2)
        .collect::<String>();
    project.merge_mode = merge_mode;
    project
}
