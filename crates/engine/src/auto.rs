// SPDX-License-Identifier: MIT

//! Batch epic runner: one worktree, sequential beads, one final merge.
//!
//! A sentinel file under the config directory records the run so a paused
//! run can resume; an exclusive advisory lock on it enforces at most one
//! runner per config directory.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::audit::{self, BeadAudit, Readiness};
use crate::orchestrator::{DoneOptions, Orchestrator};
use crate::prompt;
use wt_adapters::{git, IssueStore, MergeDriver, Multiplexer, NotifyAdapter};
use wt_core::{Clock, Error, MergeMode, Project, Session, SessionKind, SessionStatus};

/// How long to wait for the epic editor to draw its prompt.
const EDITOR_READY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct AutoOptions {
    pub epic: String,
    /// Per-bead completion deadline.
    pub timeout: Duration,
    pub merge_mode: Option<MergeMode>,
    pub dry_run: bool,
    pub pause_on_failure: bool,
    pub skip_audit: bool,
    pub resume: bool,
    pub abort: bool,
    pub force: bool,
    /// Completion-signal poll interval.
    pub poll: Duration,
}

impl AutoOptions {
    pub fn new(epic: impl Into<String>) -> Self {
        Self {
            epic: epic.into(),
            timeout: Duration::from_secs(30 * 60),
            merge_mode: None,
            dry_run: false,
            pause_on_failure: false,
            skip_audit: false,
            resume: false,
            abort: false,
            force: false,
            poll: Duration::from_secs(2),
        }
    }
}

/// Resume state persisted in `auto.sentinel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSentinel {
    pub epic: String,
    pub branch: String,
    pub worktree: PathBuf,
    pub session: String,
    /// Member beads in execution order.
    pub beads: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at_bead: Option<String>,
}

/// How an auto run finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoOutcome {
    /// Dry run: the audit report, nothing touched.
    Audited(Vec<BeadAudit>),
    Completed { pr_url: Option<String> },
    Paused { bead: String },
    Aborted,
}

impl<M, I, D, N, C> Orchestrator<M, I, D, N, C>
where
    M: Multiplexer,
    I: IssueStore,
    D: MergeDriver,
    N: NotifyAdapter,
    C: Clock,
{
    /// Run (or resume, or abort) a batch epic.
    pub async fn auto(&self, opts: AutoOptions) -> Result<AutoOutcome, Error> {
        if opts.abort {
            return self.auto_abort().await;
        }

        let project = self
            .registry
            .find_by_bead_prefix(&opts.epic)?
            .ok_or_else(|| Error::ProjectNotFound(opts.epic.clone()))?;

        if opts.resume {
            let lock = self.lock_sentinel()?;
            let sentinel = self.read_sentinel()?.ok_or_else(|| {
                Error::AutoFailed("no paused run to resume (no sentinel present)".into())
            })?;
            let start = sentinel
                .paused_at_bead
                .as_ref()
                .and_then(|paused| sentinel.beads.iter().position(|b| b == paused))
                .unwrap_or(0);
            self.ensure_epic_session(&project, &sentinel).await?;
            return self.run_beads(&project, sentinel, start, &opts, lock).await;
        }

        // Phase A: audit.
        let (ordered, audits) = if opts.skip_audit {
            let members = self.issues.deps(&project.repo_path, &opts.epic).await.map_err(Error::from)?;
            (audit::topo_order(&members), Vec::new())
        } else {
            let (ordered, audits) =
                audit::audit_epic(&self.issues, &project.repo_path, &opts.epic).await?;
            if opts.dry_run {
                return Ok(AutoOutcome::Audited(audits));
            }
            let not_ready: Vec<&str> = audits
                .iter()
                .filter(|a| a.readiness == Readiness::NotReady)
                .map(|a| a.id.as_str())
                .collect();
            if !not_ready.is_empty() && !opts.force {
                return Err(Error::AutoFailed(format!(
                    "beads not ready: {} (use --force to run anyway)",
                    not_ready.join(", ")
                )));
            }
            (ordered, audits)
        };

        if opts.dry_run {
            return Ok(AutoOutcome::Audited(audits));
        }

        let lock = self.lock_sentinel()?;
        if self.read_sentinel()?.is_some() {
            return Err(Error::AutoFailed(
                "a paused run exists; use --resume to continue or --abort to discard".into(),
            ));
        }

        // Phase B: setup, one worktree off the default branch.
        let branch = format!("epic/{}", opts.epic);
        let session_name = format!("epic-{}", opts.epic);
        let worktree = self.config.worktree_root.join(&session_name);
        git::create_from_branch(&project.repo_path, &worktree, &branch, &project.default_branch)
            .await?;

        let sentinel = AutoSentinel {
            epic: opts.epic.clone(),
            branch,
            worktree,
            session: session_name,
            beads: ordered.iter().map(|b| b.id.clone()).collect(),
            paused_at_bead: None,
        };

        if let Err(e) = self.ensure_epic_session(&project, &sentinel).await {
            let _ = git::remove(&sentinel.worktree).await;
            return Err(e);
        }
        self.write_sentinel(&sentinel)?;

        self.run_beads(&project, sentinel, 0, &opts, lock).await
    }

    /// Phase C + D: sequential per-bead loop, then one merge.
    async fn run_beads(
        &self,
        project: &Project,
        mut sentinel: AutoSentinel,
        start: usize,
        opts: &AutoOptions,
        _lock: std::fs::File,
    ) -> Result<AutoOutcome, Error> {
        for index in start..sentinel.beads.len() {
            let bead = sentinel.beads[index].clone();
            let title = self
                .issues
                .show(&project.repo_path, &bead)
                .await
                .map(|b| b.title)
                .unwrap_or_default();

            self.set_epic_status(&sentinel.session, SessionStatus::Working)?;
            self.mux
                .nudge(&sentinel.session, &prompt::auto_bead_prompt(&bead, &title, &sentinel.epic))
                .await
                .map_err(Error::from)?;

            if !self.poll_for_ready(&sentinel.session, opts).await? {
                tracing::warn!(bead, "bead did not signal ready in time");
                if opts.pause_on_failure {
                    sentinel.paused_at_bead = Some(bead.clone());
                    self.write_sentinel(&sentinel)?;
                    return Ok(AutoOutcome::Paused { bead });
                }
                self.auto_cleanup(&sentinel).await;
                return Err(Error::AutoFailed(format!(
                    "bead {bead} timed out; run with --pause-on-failure to keep state"
                )));
            }
        }

        // Phase D: one merge for the whole epic.
        let merge_mode = opts.merge_mode.unwrap_or(project.merge_mode);
        let session = self.epic_session_record(&sentinel)?;
        let pr_url = match merge_mode {
            MergeMode::Direct => {
                self.direct_merge_with_rebase(&session, project, &DoneOptions::default()).await?;
                None
            }
            MergeMode::PrAuto => {
                let url = self.open_pr(&session, project).await?;
                if let Err(e) = self.merge.enable_auto_merge(&session.worktree, &url).await {
                    tracing::warn!(pr = url, error = %e, "enable auto-merge failed");
                }
                Some(url)
            }
            MergeMode::PrReview => Some(self.open_pr(&session, project).await?),
        };

        if let Err(e) = self.events.log_session_end(
            self.clock.now_utc(),
            &session,
            merge_mode,
            pr_url.clone(),
            None,
        ) {
            tracing::warn!(error = %e, "session_end event write failed");
        }

        self.auto_cleanup(&sentinel).await;
        Ok(AutoOutcome::Completed { pr_url })
    }

    /// Wait for the worker to signal ready, within the per-bead timeout.
    /// An explicit error signal fails immediately.
    async fn poll_for_ready(&self, session: &str, opts: &AutoOptions) -> Result<bool, Error> {
        let deadline = tokio::time::Instant::now() + opts.timeout;
        loop {
            tokio::time::sleep(opts.poll).await;
            let sessions = self.sessions.load()?;
            match sessions.get(session).map(|s| s.status) {
                Some(SessionStatus::Ready) => return Ok(true),
                Some(SessionStatus::Error) => return Ok(false),
                Some(_) => {}
                // Session vanished (killed externally).
                None => return Ok(false),
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
        }
    }

    /// Abort a paused run: discard worktree, session and sentinel without
    /// merging.
    async fn auto_abort(&self) -> Result<AutoOutcome, Error> {
        let _lock = self.lock_sentinel()?;
        let Some(sentinel) = self.read_sentinel()? else {
            let _ = std::fs::remove_file(self.paths.auto_sentinel_path());
            return Ok(AutoOutcome::Aborted);
        };
        self.auto_cleanup(&sentinel).await;
        Ok(AutoOutcome::Aborted)
    }

    /// Best-effort removal of the run's resources and the sentinel.
    async fn auto_cleanup(&self, sentinel: &AutoSentinel) {
        if let Err(e) = self.mux.kill(&sentinel.session).await {
            tracing::warn!(session = %sentinel.session, error = %e, "multiplexer kill failed");
        }
        if let Err(e) = git::remove(&sentinel.worktree).await {
            tracing::warn!(worktree = %sentinel.worktree.display(), error = %e, "worktree remove failed");
        }
        if let Err(e) = self.sessions.with_lock(|sessions| {
            sessions.remove(&sentinel.session);
            Ok(())
        }) {
            tracing::warn!(error = %e, "session record removal failed");
        }
        if let Err(e) = std::fs::remove_file(self.paths.auto_sentinel_path()) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %e, "sentinel removal failed");
            }
        }
    }

    /// Make sure the epic's multiplexer session and store record exist
    /// (fresh run, or resume after a restart).
    async fn ensure_epic_session(
        &self,
        project: &Project,
        sentinel: &AutoSentinel,
    ) -> Result<(), Error> {
        if !self.mux.session_exists(&sentinel.session).await {
            self.mux
                .new_session(
                    &sentinel.session,
                    &sentinel.worktree,
                    &project.repo_path.join(".beads"),
                    &self.config.editor_cmd,
                    wt_adapters::multiplexer::NewSessionOptions::default(),
                )
                .await
                .map_err(Error::from)?;
            self.mux
                .wait_for_editor(&sentinel.session, EDITOR_READY_TIMEOUT)
                .await
                .map_err(Error::from)?;
        }

        let record = self.epic_session_record(sentinel)?;
        let now = self.clock.now_utc();
        let mut created = false;
        self.sessions.with_lock(|sessions| {
            if !sessions.contains_key(&sentinel.session) {
                sessions.insert(sentinel.session.clone(), record.clone());
                created = true;
            }
            Ok(())
        })?;
        if created {
            if let Err(e) = self.events.log_session_start(now, &record, None) {
                tracing::warn!(error = %e, "session_start event write failed");
            }
        }
        Ok(())
    }

    /// The store record representing the epic run.
    fn epic_session_record(&self, sentinel: &AutoSentinel) -> Result<Session, Error> {
        let sessions = self.sessions.load()?;
        if let Some(existing) = sessions.get(&sentinel.session) {
            return Ok(existing.clone());
        }
        let now = self.clock.now_utc();
        let project = self
            .registry
            .find_by_bead_prefix(&sentinel.epic)?
            .ok_or_else(|| Error::ProjectNotFound(sentinel.epic.clone()))?;
        Ok(Session {
            name: sentinel.session.clone(),
            project: project.name,
            worktree: sentinel.worktree.clone(),
            branch: sentinel.branch.clone(),
            port_offset: 0,
            beads_dir: project.repo_path.join(".beads"),
            created_at: now,
            last_activity: now,
            status: SessionStatus::Working,
            status_message: None,
            theme_name: None,
            kind: SessionKind::Bead { bead: sentinel.epic.clone() },
        })
    }

    fn set_epic_status(&self, session: &str, status: SessionStatus) -> Result<(), Error> {
        self.sessions.with_lock(|sessions| {
            if let Some(record) = sessions.get_mut(session) {
                record.status = status;
            }
            Ok(())
        })
    }

    /// Exclusive lock enforcing one auto runner per config directory.
    fn lock_sentinel(&self) -> Result<std::fs::File, Error> {
        let path = self.paths.auto_sentinel_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| Error::AutoFailed("another auto runner is active".into()))?;
        Ok(file)
    }

    fn read_sentinel(&self) -> Result<Option<AutoSentinel>, Error> {
        let path = self.paths.auto_sentinel_path();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::StateCorrupt(format!("{}: {e}", path.display())))
    }

    /// Write the sentinel in place. The file is already held under the
    /// runner's lock, so no rename dance here.
    fn write_sentinel(&self, sentinel: &AutoSentinel) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(sentinel)
            .map_err(|e| Error::StateCorrupt(format!("serialize sentinel: {e}")))?;
        std::fs::write(self.paths.auto_sentinel_path(), json)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "auto_tests.rs"]
mod tests;
