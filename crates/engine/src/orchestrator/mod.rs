// SPDX-License-Identifier: MIT

//! The session orchestrator: one struct owning the stores and drivers.
//!
//! Lifecycle methods are spread over submodules: `create` (new sessions),
//! `complete` (done and its merge paths), and the signal/kill/abandon
//! handlers here. Cleanup ordering is fixed so partial failures degrade
//! gracefully: merge/close-bead → teardown → on_close hooks →
//! multiplexer-kill → worktree-remove → event → state-remove. Everything
//! after the merge is best-effort.

mod create;
mod complete;

use std::collections::HashSet;
use std::path::Path;

use wt_adapters::{git, testenv, IssueStore, MergeDriver, Multiplexer, NotifyAdapter};
use wt_core::{Clock, Error, Project, Session, SessionStatus};
use wt_storage::{Config, ConfigStore, EventLog, Mailbox, ProjectRegistry, SessionStore};

pub use create::{NewOptions, SwitchMode};
pub use complete::{DoneOptions, DoneReport};

pub struct Orchestrator<M, I, D, N, C> {
    pub paths: ConfigStore,
    pub config: Config,
    pub registry: ProjectRegistry,
    pub sessions: SessionStore,
    pub events: EventLog,
    pub mailbox: Mailbox,
    pub mux: M,
    pub issues: I,
    pub merge: D,
    pub notifier: N,
    pub clock: C,
}

impl<M, I, D, N, C> Orchestrator<M, I, D, N, C>
where
    M: Multiplexer,
    I: IssueStore,
    D: MergeDriver,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(
        paths: ConfigStore,
        config: Config,
        mux: M,
        issues: I,
        merge: D,
        notifier: N,
        clock: C,
    ) -> Self {
        let registry = ProjectRegistry::new(paths.projects_dir());
        let sessions = SessionStore::new(paths.sessions_path(), paths.sessions_lock_path());
        let events = EventLog::new(paths.events_path(), paths.events_offset_path());
        let mailbox = Mailbox::new(paths.messages_path());
        Self {
            paths,
            config,
            registry,
            sessions,
            events,
            mailbox,
            mux,
            issues,
            merge,
            notifier,
            clock,
        }
    }

    /// The project a session belongs to: by stored name first, then by the
    /// bead prefix.
    pub fn project_for_session(&self, session: &Session) -> Result<Project, Error> {
        match self.registry.get(&session.project) {
            Ok(project) => Ok(project),
            Err(Error::ProjectNotFound(_)) => {
                if let Some(bead) = session.bead() {
                    if let Some(project) = self.registry.find_by_bead_prefix(bead)? {
                        return Ok(project);
                    }
                }
                Err(Error::ProjectNotFound(session.project.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// The session whose worktree encloses `cwd`, for commands run from
    /// inside a worktree.
    pub fn session_for_cwd(&self, cwd: &Path) -> Result<Session, Error> {
        let sessions = self.sessions.load()?;
        sessions
            .into_values()
            .find(|s| cwd.starts_with(&s.worktree))
            .ok_or(Error::NotInSession)
    }

    /// Port offsets held by live sessions.
    pub fn used_port_offsets(&self) -> Result<HashSet<u16>, Error> {
        let sessions = self.sessions.load()?;
        Ok(sessions.values().map(|s| s.port_offset).filter(|o| *o > 0).collect())
    }

    /// Update a session's status and bump its activity timestamp.
    ///
    /// `status` must be one of the signal vocabulary; anything else is
    /// rejected before state is touched.
    pub fn signal(
        &self,
        session_name: &str,
        status: &str,
        message: Option<String>,
    ) -> Result<SessionStatus, Error> {
        let status: SessionStatus = status.parse()?;
        let now = self.clock.now_utc();
        self.sessions.with_lock(|sessions| {
            let session = sessions
                .get_mut(session_name)
                .ok_or_else(|| Error::MultiplexerSessionMissing(session_name.to_string()))?;
            session.status = status;
            session.status_message = message.clone();
            session.last_activity = now;
            Ok(())
        })?;
        Ok(status)
    }

    /// Terminate a session from outside. The bead is deliberately left
    /// open. Killing an already-removed session is a no-op success.
    pub async fn kill(&self, name: &str, keep_worktree: bool) -> Result<(), Error> {
        let sessions = self.sessions.load()?;
        let Some(session) = sessions.get(name).cloned() else {
            return Ok(());
        };

        self.cleanup_resources(&session, keep_worktree).await;
        if let Err(e) = self.events.log_session_kill(self.clock.now_utc(), &session) {
            tracing::warn!(session = name, error = %e, "session_kill event write failed");
        }
        self.sessions.with_lock(|sessions| {
            sessions.remove(name);
            Ok(())
        })?;
        Ok(())
    }

    /// Discard the current session without merging. The bead stays open.
    pub async fn abandon(&self, session_name: &str) -> Result<(), Error> {
        let sessions = self.sessions.load()?;
        let session = sessions
            .get(session_name)
            .cloned()
            .ok_or(Error::NotInSession)?;

        self.cleanup_resources(&session, false).await;
        if let Err(e) = self.events.log_session_kill(self.clock.now_utc(), &session) {
            tracing::warn!(session = session_name, error = %e, "session_kill event write failed");
        }
        self.sessions.with_lock(|sessions| {
            sessions.remove(session_name);
            Ok(())
        })?;
        Ok(())
    }

    /// Best-effort resource teardown shared by done/abandon/kill:
    /// teardown → on_close hooks → multiplexer kill → worktree remove.
    /// Each step's failure is logged as a warning and the next step still
    /// runs.
    pub(crate) async fn cleanup_resources(&self, session: &Session, keep_worktree: bool) {
        let project = self.project_for_session(session).ok();

        if let Some(project) = &project {
            if let Some(env) = &project.test_env {
                if let Err(e) =
                    testenv::run_teardown(env, &session.worktree, session.port_offset).await
                {
                    tracing::warn!(session = %session.name, error = %e, "teardown failed");
                }
            }
            if !project.on_close.is_empty() {
                let port_env = project
                    .test_env
                    .as_ref()
                    .map(|env| env.port_env.as_str())
                    .unwrap_or("PORT_OFFSET");
                if let Err(e) = testenv::run_hooks(
                    &project.on_close,
                    &session.worktree,
                    (port_env, session.port_offset),
                )
                .await
                {
                    tracing::warn!(session = %session.name, error = %e, "on_close hook failed");
                }
            }
        }

        if let Err(e) = self.mux.kill(&session.name).await {
            tracing::warn!(session = %session.name, error = %e, "multiplexer kill failed");
        }

        if !keep_worktree {
            if let Err(e) = git::remove(&session.worktree).await {
                tracing::warn!(
                    session = %session.name,
                    worktree = %session.worktree.display(),
                    error = %e,
                    "worktree remove failed"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "../orchestrator_tests/mod.rs"]
mod tests;
