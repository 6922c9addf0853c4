// SPDX-License-Identifier: MIT

//! Derived session status and the watch loop.
//!
//! Explicit signals carry operator intent, so ready/blocked/error stick
//! until the next signal or session end; working vs idle is recomputed
//! from multiplexer activity on every tick.

use std::collections::HashMap;
use std::time::Duration;

use crate::orchestrator::Orchestrator;
use wt_adapters::{IssueStore, MergeDriver, Multiplexer, NotifyAdapter, PrState};
use wt_core::{Clock, Error, Session, SessionStatus};

/// Minutes of multiplexer inactivity before a session counts as idle.
pub const IDLE_THRESHOLD_MINUTES: u64 = 5;

/// Refresh interval of the watch loop.
pub const WATCH_INTERVAL: Duration = Duration::from_secs(2);

/// One observed transition, rendered into an OS notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Became { session: String, status: SessionStatus },
    Ended { session: String },
    PrMerged { session: String, url: String },
}

impl StatusChange {
    /// Notification title + body.
    pub fn render(&self) -> (String, String) {
        match self {
            StatusChange::Became { session, status } => {
                (format!("wt: {session}"), format!("session is {status}"))
            }
            StatusChange::Ended { session } => {
                (format!("wt: {session}"), "session ended".to_string())
            }
            StatusChange::PrMerged { session, url } => {
                (format!("wt: {session}"), format!("PR merged: {url}"))
            }
        }
    }
}

/// Last-seen statuses between ticks.
#[derive(Debug, Default)]
pub struct WatchState {
    statuses: HashMap<String, SessionStatus>,
    pr_merged: HashMap<String, bool>,
}

impl<M, I, D, N, C> Orchestrator<M, I, D, N, C>
where
    M: Multiplexer,
    I: IssueStore,
    D: MergeDriver,
    N: NotifyAdapter,
    C: Clock,
{
    /// Live status for one session: explicit ready/blocked/error wins,
    /// otherwise multiplexer idle time decides working vs idle.
    pub async fn derived_status(&self, session: &Session) -> SessionStatus {
        match session.status {
            SessionStatus::Ready | SessionStatus::Blocked | SessionStatus::Error => session.status,
            SessionStatus::Working | SessionStatus::Idle => {
                let idle_minutes = self.idle_minutes(session).await;
                match idle_minutes {
                    Some(minutes) if minutes >= IDLE_THRESHOLD_MINUTES => SessionStatus::Idle,
                    Some(_) => SessionStatus::Working,
                    // No multiplexer data: keep the stored status.
                    None => session.status,
                }
            }
        }
    }

    async fn idle_minutes(&self, session: &Session) -> Option<u64> {
        let activity = self.mux.last_activity_epoch(&session.name).await.ok().flatten()?;
        let now_secs = self.clock.epoch_ms() / 1000;
        Some(now_secs.saturating_sub(activity) / 60)
    }

    /// One watch tick: diff derived statuses against the previous tick and
    /// return the transitions worth notifying about (→ ready, → idle,
    /// → error, → blocked, ended, merged).
    pub async fn watch_tick(&self, state: &mut WatchState) -> Result<Vec<StatusChange>, Error> {
        let sessions = self.sessions.load()?;
        let mut changes = Vec::new();

        for session in sessions.values() {
            let status = self.derived_status(session).await;
            let previous = state.statuses.insert(session.name.clone(), status);
            let transitioned = previous.is_some_and(|p| p != status);
            let notable = matches!(
                status,
                SessionStatus::Ready
                    | SessionStatus::Idle
                    | SessionStatus::Error
                    | SessionStatus::Blocked
            );
            if transitioned && notable {
                changes.push(StatusChange::Became { session: session.name.clone(), status });
            }

            // PR state only matters once a PR URL is in the status message.
            if let Some(url) = session.status_message.as_deref().and_then(pr_url_in) {
                let seen = state.pr_merged.get(session.name.as_str()).copied().unwrap_or(false);
                if !seen {
                    if let Ok(PrState::Merged) = self.merge.pr_state(&session.worktree, url).await
                    {
                        state.pr_merged.insert(session.name.clone(), true);
                        changes.push(StatusChange::PrMerged {
                            session: session.name.clone(),
                            url: url.to_string(),
                        });
                    }
                }
            }
        }

        // Sessions that disappeared since the last tick ended.
        let ended: Vec<String> = state
            .statuses
            .keys()
            .filter(|name| !sessions.contains_key(*name))
            .cloned()
            .collect();
        for name in ended {
            state.statuses.remove(&name);
            state.pr_merged.remove(&name);
            changes.push(StatusChange::Ended { session: name });
        }

        Ok(changes)
    }

    /// Watch loop: refresh every 2 s, notify on transitions, stop on
    /// ctrl-c.
    pub async fn watch(&self) -> Result<(), Error> {
        let mut state = WatchState::default();
        // Prime the baseline so startup does not notify for every session.
        let _ = self.watch_tick(&mut state).await?;

        let mut interval = tokio::time::interval(WATCH_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => return Ok(()),
                _ = interval.tick() => {
                    match self.watch_tick(&mut state).await {
                        Ok(changes) => {
                            for change in changes {
                                let (title, body) = change.render();
                                if let Err(e) = self.notifier.notify(&title, &body).await {
                                    tracing::warn!(error = %e, "notification failed");
                                }
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "watch tick failed"),
                    }
                }
            }
        }
    }
}

fn pr_url_in(message: &str) -> Option<&str> {
    message.split_whitespace().find(|w| w.starts_with("https://") || w.starts_with("http://"))
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
