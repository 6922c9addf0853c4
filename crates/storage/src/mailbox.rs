// SPDX-License-Identifier: MIT

//! Durable mailbox for worker ↔ hub coordination (`messages.db`).
//!
//! One JSON message per line. Sends append; `ack` rewrites the file through
//! the usual temp + rename. The volume here is a handful of rows, so the
//! rewrite is cheap and keeps the store greppable.

use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use wt_core::{Error, Message, Subject};

use crate::fsutil;

#[derive(Debug, Clone)]
pub struct Mailbox {
    path: PathBuf,
}

impl Mailbox {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append a new message and return it (with its generated id).
    pub fn send(
        &self,
        at: DateTime<Utc>,
        subject: Subject,
        from: &str,
        to: &str,
        body: &str,
        thread: Option<String>,
    ) -> Result<Message, Error> {
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            subject,
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
            thread,
            created_at: at,
            acked_at: None,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(&message)
            .map_err(|e| Error::StateCorrupt(format!("serialize message: {e}")))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(message)
    }

    /// Unacked messages for a recipient, oldest first, optionally filtered
    /// by subject.
    pub fn recv(&self, to: &str, subject: Option<Subject>) -> Result<Vec<Message>, Error> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|m| m.to == to && !m.is_acked())
            .filter(|m| subject.is_none_or(|s| m.subject == s))
            .collect())
    }

    /// Mark a message acked. Returns false when the id is unknown or the
    /// message was already acked.
    pub fn ack(&self, id: &str, at: DateTime<Utc>) -> Result<bool, Error> {
        let mut messages = self.read_all()?;
        let mut changed = false;
        for message in &mut messages {
            if message.id == id && !message.is_acked() {
                message.acked_at = Some(at);
                changed = true;
            }
        }
        if changed {
            self.rewrite(&messages)?;
        }
        Ok(changed)
    }

    /// All messages in a thread, acked or not, oldest first.
    pub fn thread(&self, thread_id: &str) -> Result<Vec<Message>, Error> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|m| m.thread.as_deref() == Some(thread_id))
            .collect())
    }

    fn read_all(&self) -> Result<Vec<Message>, Error> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unparseable message line");
                    None
                }
            })
            .collect())
    }

    fn rewrite(&self, messages: &[Message]) -> Result<(), Error> {
        let mut out = String::new();
        for message in messages {
            let line = serde_json::to_string(message)
                .map_err(|e| Error::StateCorrupt(format!("serialize message: {e}")))?;
            out.push_str(&line);
            out.push('\n');
        }
        fsutil::atomic_write(&self.path, out.as_bytes())
    }
}

#[cfg(test)]
#[path = "mailbox_tests.rs"]
mod tests;
