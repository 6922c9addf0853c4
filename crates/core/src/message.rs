// SPDX-License-Identifier: MIT

//! Mailbox messages for worker ↔ hub coordination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message subject line, fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Subject {
    Task,
    Done,
    Stuck,
    Progress,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Subject::Task => "TASK",
            Subject::Done => "DONE",
            Subject::Stuck => "STUCK",
            Subject::Progress => "PROGRESS",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TASK" => Ok(Subject::Task),
            "DONE" => Ok(Subject::Done),
            "STUCK" => Ok(Subject::Stuck),
            "PROGRESS" => Ok(Subject::Progress),
            other => Err(format!("unknown subject '{other}'")),
        }
    }
}

/// One durable mailbox row. Once `acked_at` is set the message is no longer
/// visible to `recv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub subject: Subject,
    pub from: String,
    pub to: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acked_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn is_acked(&self) -> bool {
        self.acked_at.is_some()
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
