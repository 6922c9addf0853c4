// SPDX-License-Identifier: MIT

//! Session completion: the `done` transition and its merge paths.

use std::path::Path;

use super::Orchestrator;
use wt_adapters::merge::MergeError;
use wt_adapters::subprocess::{run_with_timeout, HOOK_TIMEOUT};
use wt_adapters::{IssueStore, MergeDriver, Multiplexer, NotifyAdapter, PrState};
use wt_core::{AutoRebase, Clock, CompletionCondition, Error, MergeMode, Project, Session};

/// Options for `done`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoneOptions {
    /// Override of the project's merge mode.
    pub merge_mode: Option<MergeMode>,
    /// Explicit rebase decision; `None` falls back to the project's
    /// auto-rebase policy.
    pub rebase_consent: Option<bool>,
    /// Caller's assent for the `user-confirm` completion condition.
    pub user_confirmed: bool,
}

/// What `done` did, for the CLI's summary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoneReport {
    pub merge_mode: MergeMode,
    pub pr_url: Option<String>,
}

impl<M, I, D, N, C> Orchestrator<M, I, D, N, C>
where
    M: Multiplexer,
    I: IssueStore,
    D: MergeDriver,
    N: NotifyAdapter,
    C: Clock,
{
    /// Complete a session: merge its work, close its bead, release its
    /// resources. A failed merge leaves the session live and the bead
    /// open; nothing is partially cleaned up.
    pub async fn done(&self, session_name: &str, opts: DoneOptions) -> Result<DoneReport, Error> {
        let sessions = self.sessions.load()?;
        let session = sessions
            .get(session_name)
            .cloned()
            .ok_or(Error::NotInSession)?;

        if self
            .merge
            .has_uncommitted_changes(&session.worktree)
            .await
            .map_err(Error::from)?
        {
            return Err(Error::UncommittedChanges);
        }

        let project = self.project_for_session(&session)?;
        let merge_mode = opts.merge_mode.unwrap_or(project.merge_mode);

        if session.is_task() {
            self.check_completion_condition(&session, &opts).await?;
        }

        // Merge is the only fatal phase.
        let pr_url = self.run_merge(&session, &project, merge_mode, &opts).await?;

        if let Some(bead) = session.bead() {
            if let Err(e) = self.issues.close(&project.repo_path, bead).await {
                tracing::warn!(bead, error = %e, "bead close failed");
            }
        }

        self.cleanup_resources(&session, false).await;

        let now = self.clock.now_utc();
        if let Err(e) =
            self.events.log_session_end(now, &session, merge_mode, pr_url.clone(), None)
        {
            tracing::warn!(session = session_name, error = %e, "session_end event write failed");
        }
        self.sessions.with_lock(|sessions| {
            sessions.remove(session_name);
            Ok(())
        })?;

        Ok(DoneReport { merge_mode, pr_url })
    }

    /// Run the merge path for the chosen mode; returns the PR URL for the
    /// PR modes.
    async fn run_merge(
        &self,
        session: &Session,
        project: &Project,
        merge_mode: MergeMode,
        opts: &DoneOptions,
    ) -> Result<Option<String>, Error> {
        match merge_mode {
            MergeMode::Direct => {
                self.direct_merge_with_rebase(session, project, opts).await?;
                Ok(None)
            }
            MergeMode::PrAuto => {
                let url = self.open_pr(session, project).await?;
                if let Err(e) = self.merge.enable_auto_merge(&session.worktree, &url).await {
                    tracing::warn!(pr = url, error = %e, "enable auto-merge failed");
                }
                Ok(Some(url))
            }
            MergeMode::PrReview => {
                let url = self.open_pr(session, project).await?;
                Ok(Some(url))
            }
        }
    }

    /// Direct merge, applying the project's auto-rebase policy when the
    /// first attempt hits a conflict or non-fast-forward state.
    pub(crate) async fn direct_merge_with_rebase(
        &self,
        session: &Session,
        project: &Project,
        opts: &DoneOptions,
    ) -> Result<(), Error> {
        match self
            .merge
            .direct_merge(&session.worktree, &session.branch, &project.default_branch)
            .await
        {
            Ok(()) => Ok(()),
            Err(MergeError::Conflict(reason)) => {
                let rebase = opts.rebase_consent.unwrap_or(match project.auto_rebase {
                    AutoRebase::On => true,
                    AutoRebase::Off | AutoRebase::Prompt => false,
                });
                if !rebase {
                    let hint = match project.auto_rebase {
                        AutoRebase::Prompt => {
                            "re-run `wt done` and confirm the rebase, or rebase by hand"
                        }
                        _ => "rebase the branch onto the default branch and re-run `wt done`",
                    };
                    return Err(Error::MergeConflict(format!("{reason} ({hint})")));
                }
                self.merge
                    .rebase_onto_default(&session.worktree, &project.default_branch)
                    .await
                    .map_err(Error::from)?;
                self.merge
                    .direct_merge(&session.worktree, &session.branch, &project.default_branch)
                    .await
                    .map_err(Error::from)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Push and open the PR, logging a pr_created event on success.
    pub(crate) async fn open_pr(&self, session: &Session, project: &Project) -> Result<String, Error> {
        let title = match session.bead() {
            Some(bead) => self
                .issues
                .show(&project.repo_path, bead)
                .await
                .map(|b| b.title)
                .unwrap_or_else(|_| session.branch.clone()),
            None => match &session.kind {
                wt_core::SessionKind::Task { description, .. } => description.clone(),
                wt_core::SessionKind::Bead { bead } => bead.clone(),
            },
        };
        let url = self
            .merge
            .create_pr(&session.worktree, &session.branch, &project.default_branch, &title)
            .await
            .map_err(Error::from)?;
        if let Err(e) = self.events.log_pr_created(self.clock.now_utc(), session, &url) {
            tracing::warn!(pr = url, error = %e, "pr_created event write failed");
        }
        Ok(url)
    }

    /// Task sessions only complete once their condition holds.
    async fn check_completion_condition(
        &self,
        session: &Session,
        opts: &DoneOptions,
    ) -> Result<(), Error> {
        let condition = session.completion_condition().unwrap_or_default();
        match condition {
            CompletionCondition::None => Ok(()),
            CompletionCondition::Pushed => {
                if self.merge.is_pushed(&session.worktree).await.map_err(Error::from)? {
                    Ok(())
                } else {
                    Err(Error::ConditionUnmet(
                        "branch is ahead of origin; push before `wt done`".into(),
                    ))
                }
            }
            CompletionCondition::PrMerged => {
                let url = session
                    .status_message
                    .as_deref()
                    .and_then(extract_url)
                    .ok_or_else(|| {
                        Error::ConditionUnmet(
                            "no PR URL in the status message; `wt signal ready <url>` first".into(),
                        )
                    })?;
                match self.merge.pr_state(&session.worktree, url).await.map_err(Error::from)? {
                    PrState::Merged => Ok(()),
                    state => Err(Error::ConditionUnmet(format!("PR is {state:?}, not merged"))),
                }
            }
            CompletionCondition::TestsPass => run_detected_tests(&session.worktree).await,
            CompletionCondition::UserConfirm => {
                if opts.user_confirmed {
                    Ok(())
                } else {
                    Err(Error::ConditionUnmet("confirm completion to proceed".into()))
                }
            }
        }
    }
}

/// First http(s) token in a status message.
pub(crate) fn extract_url(message: &str) -> Option<&str> {
    message.split_whitespace().find(|w| w.starts_with("https://") || w.starts_with("http://"))
}

/// First recognizable test command for the worktree's project type.
pub(crate) fn detect_test_command(worktree: &Path) -> Option<&'static str> {
    if worktree.join("Cargo.toml").is_file() {
        Some("cargo test")
    } else if worktree.join("package.json").is_file() {
        Some("npm test")
    } else if worktree.join("go.mod").is_file() {
        Some("go test ./...")
    } else if worktree.join("Makefile").is_file() {
        Some("make test")
    } else {
        None
    }
}

/// Run the detected test command to success.
async fn run_detected_tests(worktree: &Path) -> Result<(), Error> {
    let Some(command) = detect_test_command(worktree) else {
        return Err(Error::ConditionUnmet("no test command detected in the worktree".into()));
    };
    let mut cmd = tokio::process::Command::new("sh");
    cmd.args(["-c", command]).current_dir(worktree);
    let output = run_with_timeout(cmd, HOOK_TIMEOUT, command)
        .await
        .map_err(|e| Error::ConditionUnmet(e.to_string()))?;
    if !output.status.success() {
        return Err(Error::ConditionUnmet(format!("`{command}` failed")));
    }
    Ok(())
}
