// SPDX-License-Identifier: MIT

//! Output helpers: text tables vs `--json`.

use chrono::{DateTime, Utc};
use wt_core::Session;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Relative time like "5s", "2m", "1h", "3d".
pub fn format_time_ago(when: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - when).num_seconds().max(0) as u64;
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86_400)
    }
}

/// Print the session table: NAME, PROJECT, UNIT, STATUS, ACTIVITY.
pub fn print_sessions(sessions: &[Session], now: DateTime<Utc>) {
    if sessions.is_empty() {
        println!("No active sessions");
        return;
    }

    let name_width = sessions.iter().map(|s| s.name.len()).max().unwrap_or(0).max("NAME".len());
    let project_width =
        sessions.iter().map(|s| s.project.len()).max().unwrap_or(0).max("PROJECT".len());
    let unit_width = sessions
        .iter()
        .map(|s| s.bead().unwrap_or("task").len())
        .max()
        .unwrap_or(0)
        .max("UNIT".len());

    println!(
        "{:<name_width$} {:<project_width$} {:<unit_width$} {:<8} ACTIVITY",
        "NAME", "PROJECT", "UNIT", "STATUS"
    );
    for session in sessions {
        println!(
            "{:<name_width$} {:<project_width$} {:<unit_width$} {:<8} {}",
            session.name,
            session.project,
            session.bead().unwrap_or("task"),
            session.status.to_string(),
            format_time_ago(session.last_activity, now)
        );
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
