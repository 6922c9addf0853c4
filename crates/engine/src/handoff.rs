// SPDX-License-Identifier: MIT

//! Hub handoff and prime: context across editor restarts.
//!
//! `handoff` snapshots hub context into an artifact and drops a sentinel;
//! after the editor restarts, `prime` injects the artifact back, archives
//! it, and clears the sentinel.

use crate::orchestrator::Orchestrator;
use wt_adapters::{BeadCreate, IssueStore, MergeDriver, Multiplexer, NotifyAdapter};
use wt_core::{Clock, Error};

/// Title of the hub-local bead that retains the latest handoff body.
const HANDOFF_BEAD_TITLE: &str = "Hub handoff";

#[derive(Debug, Clone, Default)]
pub struct HandoffOptions {
    /// Extra note from the operator, placed at the top of the artifact.
    pub message: Option<String>,
    /// Assemble and return the artifact without writing anything.
    pub dry_run: bool,
}

impl<M, I, D, N, C> Orchestrator<M, I, D, N, C>
where
    M: Multiplexer,
    I: IssueStore,
    D: MergeDriver,
    N: NotifyAdapter,
    C: Clock,
{
    /// Collect hub context, write the handoff artifact and sentinel, and
    /// retain the body in the hub-local handoff bead. The caller restarts
    /// the editor afterwards.
    pub async fn handoff(&self, opts: HandoffOptions) -> Result<String, Error> {
        let body = self.assemble_handoff(&opts).await?;
        if opts.dry_run {
            return Ok(body);
        }

        std::fs::create_dir_all(self.paths.dir())?;
        std::fs::write(self.paths.handoff_path(), &body)?;

        if let Err(e) = self.upsert_handoff_bead(&body).await {
            tracing::warn!(error = %e, "handoff bead update failed");
        }

        let now = self.clock.now_utc();
        std::fs::write(self.paths.handoff_sentinel_path(), now.to_rfc3339())?;

        let editor_session = match self.mux.current_session().await {
            Ok(name) if !name.is_empty() => Some(name),
            _ => None,
        };
        if let Err(e) = self.events.log_hub_handoff(now, "hub", editor_session) {
            tracing::warn!(error = %e, "hub_handoff event write failed");
        }

        Ok(body)
    }

    /// Consume a pending handoff at editor start: inject the artifact via
    /// nudge, archive it, remove the sentinel. Without a sentinel this is
    /// a no-op returning `None`.
    pub async fn prime(&self) -> Result<Option<String>, Error> {
        if !self.paths.handoff_sentinel_path().is_file() {
            return Ok(None);
        }
        let body = match std::fs::read_to_string(self.paths.handoff_path()) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Sentinel without artifact: stale, clear it.
                let _ = std::fs::remove_file(self.paths.handoff_sentinel_path());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if let Ok(current) = self.mux.current_session().await {
            if !current.is_empty() {
                if let Err(e) = self.mux.nudge(&current, &body).await {
                    tracing::warn!(error = %e, "handoff injection failed");
                }
            }
        }

        // Archive atomically, then clear the sentinel.
        let stamp = self.clock.now_utc().format("%Y%m%d-%H%M%S").to_string();
        std::fs::rename(self.paths.handoff_path(), self.paths.handoff_archive_path(&stamp))?;
        std::fs::remove_file(self.paths.handoff_sentinel_path())?;

        Ok(Some(body))
    }

    /// Structured context: active sessions, ready beads per project,
    /// in-progress beads.
    async fn assemble_handoff(&self, opts: &HandoffOptions) -> Result<String, Error> {
        let now = self.clock.now_utc();
        let mut body = format!("# Hub handoff {}\n", now.to_rfc3339());

        if let Some(message) = &opts.message {
            body.push_str(&format!("\n> {message}\n"));
        }

        let sessions = self.sessions.load()?;
        body.push_str("\n## Active sessions\n");
        if sessions.is_empty() {
            body.push_str("(none)\n");
        }
        for session in sessions.values() {
            let unit = session.bead().unwrap_or("task");
            body.push_str(&format!(
                "- {} [{}] {}: {}\n",
                session.name,
                session.project,
                unit,
                session.status
            ));
            if let Some(message) = &session.status_message {
                body.push_str(&format!("  note: {message}\n"));
            }
        }

        for project in self.registry.list()? {
            let ready = match self.issues.ready(&project.repo_path).await {
                Ok(ready) => ready,
                Err(e) => {
                    tracing::warn!(project = project.name, error = %e, "ready query failed");
                    continue;
                }
            };
            if !ready.is_empty() {
                body.push_str(&format!("\n## Ready beads: {}\n", project.name));
                for bead in ready {
                    body.push_str(&format!("- {}: {}\n", bead.id, bead.title));
                }
            }
            if let Ok(in_progress) =
                self.issues.list(&project.repo_path, Some("in_progress")).await
            {
                if !in_progress.is_empty() {
                    body.push_str(&format!("\n## In progress: {}\n", project.name));
                    for bead in in_progress {
                        body.push_str(&format!("- {}: {}\n", bead.id, bead.title));
                    }
                }
            }
        }

        Ok(body)
    }

    /// Keep the latest handoff body on a hub-local bead so it survives
    /// artifact archiving.
    async fn upsert_handoff_bead(&self, body: &str) -> Result<(), Error> {
        let hub_dir = self.paths.hub_beads_dir();
        if !hub_dir.exists() {
            std::fs::create_dir_all(&hub_dir)?;
            if let Err(e) = self.issues.init(&hub_dir, "hub").await {
                tracing::warn!(error = %e, "hub issue store init failed");
            }
        }

        let existing = self
            .issues
            .list(&hub_dir, None)
            .await
            .map_err(Error::from)?
            .into_iter()
            .find(|b| b.title == HANDOFF_BEAD_TITLE);

        match existing {
            Some(bead) => {
                self.issues
                    .update_description(&hub_dir, &bead.id, body)
                    .await
                    .map_err(Error::from)?;
            }
            None => {
                self.issues
                    .create(
                        &hub_dir,
                        BeadCreate {
                            title: HANDOFF_BEAD_TITLE.to_string(),
                            issue_type: Some("note".to_string()),
                            priority: None,
                            description: Some(body.to_string()),
                        },
                    )
                    .await
                    .map_err(Error::from)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
