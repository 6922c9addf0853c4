// SPDX-License-Identifier: MIT

//! Seance: resume a past AI editor session by its recorded id.
//!
//! session_end and hub_handoff events carry the editor's internal session
//! id; seance looks one up and spawns a fresh multiplexer session running
//! the editor in resume mode.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::orchestrator::Orchestrator;
use wt_adapters::multiplexer::NewSessionOptions;
use wt_adapters::{IssueStore, MergeDriver, Multiplexer, NotifyAdapter};
use wt_core::{Clock, Error};

const EDITOR_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// A past session that can be resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeanceTarget {
    pub session: String,
    pub editor_session: String,
    pub when: DateTime<Utc>,
    pub bead: String,
    pub project: String,
}

impl<M, I, D, N, C> Orchestrator<M, I, D, N, C>
where
    M: Multiplexer,
    I: IssueStore,
    D: MergeDriver,
    N: NotifyAdapter,
    C: Clock,
{
    /// The most recent resumable sessions, newest first.
    pub fn seance_candidates(&self, n: usize) -> Result<Vec<SeanceTarget>, Error> {
        Ok(self
            .events
            .recent_sessions(n)?
            .into_iter()
            .filter_map(|e| {
                let editor_session = e.editor_session.clone()?;
                Some(SeanceTarget {
                    session: e.session,
                    editor_session,
                    when: e.timestamp,
                    bead: e.bead,
                    project: e.project,
                })
            })
            .collect())
    }

    /// Resolve a target: by session name when given, else the most recent
    /// resumable session.
    pub fn seance_target(&self, name: Option<&str>) -> Result<SeanceTarget, Error> {
        match name {
            Some(name) => {
                let event = self
                    .events
                    .find_session(name)?
                    .ok_or_else(|| Error::MultiplexerSessionMissing(name.to_string()))?;
                let editor_session = event
                    .editor_session
                    .clone()
                    .ok_or_else(|| Error::MultiplexerSessionMissing(name.to_string()))?;
                Ok(SeanceTarget {
                    session: event.session,
                    editor_session,
                    when: event.timestamp,
                    bead: event.bead,
                    project: event.project,
                })
            }
            None => self
                .seance_candidates(1)?
                .into_iter()
                .next()
                .ok_or_else(|| Error::MultiplexerSessionMissing("(no past sessions)".into())),
        }
    }

    /// The command line that would resume the target, for display.
    pub fn seance_command(&self, target: &SeanceTarget) -> String {
        format!("{} --resume {}", self.config.editor_cmd, target.editor_session)
    }

    /// Spawn a fresh multiplexer session resuming the target's editor
    /// session, optionally nudging an initial prompt into it.
    pub async fn seance_spawn(
        &self,
        target: &SeanceTarget,
        initial_prompt: Option<&str>,
    ) -> Result<String, Error> {
        // Work from the project's repo when it is still registered; the
        // original worktree is long gone.
        let workdir = match self.registry.get(&target.project) {
            Ok(project) => project.repo_path,
            Err(_) => self.paths.dir().to_path_buf(),
        };
        let beads_dir = workdir.join(".beads");

        let name = format!("seance-{}", target.session);
        if self.mux.session_exists(&name).await {
            return Err(Error::SessionExists(name));
        }
        self.mux
            .new_session(
                &name,
                &workdir,
                &beads_dir,
                &self.seance_command(target),
                NewSessionOptions::default(),
            )
            .await
            .map_err(Error::from)?;
        self.mux.wait_for_editor(&name, EDITOR_READY_TIMEOUT).await.map_err(Error::from)?;
        if let Some(prompt) = initial_prompt {
            self.mux.nudge(&name, prompt).await.map_err(Error::from)?;
        }
        Ok(name)
    }
}

#[cfg(test)]
#[path = "seance_tests.rs"]
mod tests;
