// SPDX-License-Identifier: MIT

//! Append-only event log (`events.log`, newline-delimited JSON).
//!
//! Events are appended after their triggering side-effect completes and are
//! never mutated. A sidecar file (`events.offset`) records the byte offset
//! of the last event the current user has read, which backs the
//! shell-hook-facing `new_since_last_read`.

use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use wt_core::{Error, Event, EventKind, MergeMode, Session};

use crate::fsutil;

#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
    offset_path: PathBuf,
}

impl EventLog {
    pub fn new(path: PathBuf, offset_path: PathBuf) -> Self {
        Self { path, offset_path }
    }

    /// Append one event as a single JSON line.
    pub fn append(&self, event: &Event) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(event)
            .map_err(|e| Error::StateCorrupt(format!("serialize event: {e}")))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    pub fn log_session_start(
        &self,
        at: DateTime<Utc>,
        session: &Session,
        editor_session: Option<String>,
    ) -> Result<(), Error> {
        let mut event = Event::new(
            at,
            EventKind::SessionStart,
            &session.name,
            session.bead().unwrap_or(""),
            &session.project,
        )
        .with_worktree(session.worktree.display().to_string());
        event.editor_session = editor_session;
        self.append(&event)
    }

    pub fn log_session_end(
        &self,
        at: DateTime<Utc>,
        session: &Session,
        merge_mode: MergeMode,
        pr_url: Option<String>,
        editor_session: Option<String>,
    ) -> Result<(), Error> {
        let mut event = Event::new(
            at,
            EventKind::SessionEnd,
            &session.name,
            session.bead().unwrap_or(""),
            &session.project,
        )
        .with_merge_mode(merge_mode)
        .with_pr_url(pr_url.unwrap_or_default());
        event.editor_session = editor_session;
        self.append(&event)
    }

    pub fn log_session_kill(&self, at: DateTime<Utc>, session: &Session) -> Result<(), Error> {
        self.append(&Event::new(
            at,
            EventKind::SessionKill,
            &session.name,
            session.bead().unwrap_or(""),
            &session.project,
        ))
    }

    pub fn log_hub_handoff(
        &self,
        at: DateTime<Utc>,
        session_name: &str,
        editor_session: Option<String>,
    ) -> Result<(), Error> {
        let mut event = Event::new(at, EventKind::HubHandoff, session_name, "", "");
        event.editor_session = editor_session;
        self.append(&event)
    }

    pub fn log_pr_created(
        &self,
        at: DateTime<Utc>,
        session: &Session,
        url: &str,
    ) -> Result<(), Error> {
        self.append(
            &Event::new(
                at,
                EventKind::PrCreated,
                &session.name,
                session.bead().unwrap_or(""),
                &session.project,
            )
            .with_pr_url(url),
        )
    }

    pub fn log_pr_merged(
        &self,
        at: DateTime<Utc>,
        session_name: &str,
        bead: &str,
        project: &str,
        url: &str,
    ) -> Result<(), Error> {
        self.append(
            &Event::new(at, EventKind::PrMerged, session_name, bead, project).with_pr_url(url),
        )
    }

    /// All parseable events in append order. Unparseable lines are skipped
    /// with a warning so one bad write never poisons the log.
    pub fn read_all(&self) -> Result<Vec<Event>, Error> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(parse_lines(&content))
    }

    /// The last `n` events in time order.
    pub fn recent(&self, n: usize) -> Result<Vec<Event>, Error> {
        let mut events = self.read_all()?;
        let start = events.len().saturating_sub(n);
        Ok(events.split_off(start))
    }

    /// Events newer than `cutoff`.
    pub fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Event>, Error> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.timestamp > cutoff)
            .collect())
    }

    /// Most recent session_end or hub_handoff for a session name. This is
    /// the seance lookup: those two kinds carry the editor session id.
    pub fn find_session(&self, name: &str) -> Result<Option<Event>, Error> {
        Ok(self
            .read_all()?
            .into_iter()
            .rev()
            .find(|e| {
                e.session == name
                    && matches!(e.kind, EventKind::SessionEnd | EventKind::HubHandoff)
            }))
    }

    /// The most recent `n` events carrying an editor session id, newest
    /// first.
    pub fn recent_sessions(&self, n: usize) -> Result<Vec<Event>, Error> {
        Ok(self
            .read_all()?
            .into_iter()
            .rev()
            .filter(|e| e.editor_session.is_some())
            .take(n)
            .collect())
    }

    /// Events appended since the recorded read offset. With `clear`, the
    /// offset advances to the current end of log.
    pub fn new_since_last_read(&self, clear: bool) -> Result<Vec<Event>, Error> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let mut file = std::fs::File::open(&self.path)?;
        let len = file.metadata()?.len();

        let mut offset = self.read_offset()?;
        if offset > len {
            // Log was truncated or rotated; start over.
            offset = 0;
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let events = parse_lines(&content);

        if clear {
            fsutil::atomic_write(&self.offset_path, len.to_string().as_bytes())?;
        }
        Ok(events)
    }

    fn read_offset(&self) -> Result<u64, Error> {
        match std::fs::read_to_string(&self.offset_path) {
            Ok(s) => Ok(s.trim().parse().unwrap_or(0)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Follow appends to the log. Polls the file at `poll` intervals (the
    /// log may live on filesystems without change notification) and sends
    /// each new event; the task stops when the receiver is dropped.
    pub fn tail(&self, poll: Duration) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(64);
        let path = self.path.clone();
        tokio::spawn(async move {
            let mut offset = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            loop {
                tokio::time::sleep(poll).await;
                let len = match std::fs::metadata(&path) {
                    Ok(m) => m.len(),
                    Err(_) => continue,
                };
                if len < offset {
                    // Truncated; re-read from the start.
                    offset = 0;
                }
                if len == offset {
                    continue;
                }
                let chunk = match read_from(&path, offset) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::warn!(error = %e, "event log tail read failed");
                        continue;
                    }
                };
                offset = len;
                for event in parse_lines(&chunk) {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        });
        rx
    }
}

fn read_from(path: &std::path::Path, offset: u64) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

fn parse_lines(content: &str) -> Vec<Event> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unparseable event line");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
