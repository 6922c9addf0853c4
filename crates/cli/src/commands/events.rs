// SPDX-License-Identifier: MIT

//! Event log queries, the watch dashboard, and seance.

use anyhow::Result;
use clap::Args;
use std::time::Duration;

use crate::output::OutputFormat;
use crate::Wt;
use wt_core::{Clock, Event};

#[derive(Args)]
pub struct EventsArgs {
    /// Only events newer than this, e.g. 30m, 2h, 1d
    #[arg(long)]
    pub since: Option<String>,
    /// Follow appends until interrupted
    #[arg(long)]
    pub follow: bool,
    /// Number of recent events
    #[arg(short = 'n', long, default_value_t = 20)]
    pub count: usize,
    /// Only events unseen since the last cleared read
    #[arg(long)]
    pub new: bool,
    /// With --new: advance the read offset
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args)]
pub struct SeanceArgs {
    /// Past session name (default: the most recent resumable session)
    pub name: Option<String>,
    /// Initial prompt to send into the resumed editor
    #[arg(short = 'p', long)]
    pub prompt: Option<String>,
    /// Spawn a multiplexer session running the resumed editor
    #[arg(long)]
    pub spawn: bool,
}

/// Parse "90s", "30m", "2h", "1d" (bare numbers are minutes).
pub(crate) fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let (value, unit) = match s.char_indices().rfind(|(_, c)| c.is_ascii_digit()) {
        Some((i, _)) => s.split_at(i + 1),
        None => anyhow::bail!("invalid duration '{s}'"),
    };
    let value: u64 = value.parse().map_err(|_| anyhow::anyhow!("invalid duration '{s}'"))?;
    let secs = match unit {
        "s" => value,
        "" | "m" => value * 60,
        "h" => value * 3600,
        "d" => value * 86_400,
        _ => anyhow::bail!("invalid duration unit '{unit}'"),
    };
    Ok(Duration::from_secs(secs))
}

fn print_event(event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
        }
        OutputFormat::Text => {
            let unit = if event.bead.is_empty() { "-" } else { &event.bead };
            let extra = event.pr_url.as_deref().filter(|u| !u.is_empty()).unwrap_or("");
            println!(
                "{}  {:?}  {}  {}  {}",
                event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                event.kind,
                event.session,
                unit,
                extra
            );
        }
    }
}

pub async fn events(wt: &Wt, args: EventsArgs, format: OutputFormat) -> Result<()> {
    if args.new {
        for event in wt.events.new_since_last_read(args.clear)? {
            print_event(&event, format);
        }
        return Ok(());
    }

    let events = match &args.since {
        Some(since) => {
            let duration = parse_duration(since)?;
            let cutoff = wt.clock.now_utc()
                - chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
            wt.events.since(cutoff)?
        }
        None => wt.events.recent(args.count)?,
    };
    for event in &events {
        print_event(event, format);
    }

    if args.follow {
        let mut rx = wt.events.tail(Duration::from_millis(500));
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => return Ok(()),
                event = rx.recv() => match event {
                    Some(event) => print_event(&event, format),
                    None => return Ok(()),
                },
            }
        }
    }
    Ok(())
}

pub async fn watch(wt: &Wt) -> Result<()> {
    // Already inside a watch popup: refuse to recurse.
    if std::env::var("WT_WATCH_POPUP").map(|v| v == "1").unwrap_or(false) {
        anyhow::bail!("already inside a watch popup");
    }
    wt.watch().await?;
    Ok(())
}

pub async fn seance(wt: &Wt, args: SeanceArgs) -> Result<()> {
    if args.name.is_none() && !args.spawn {
        // No target named: show what could be resumed.
        let candidates = wt.seance_candidates(10)?;
        if candidates.is_empty() {
            println!("No resumable sessions in the event log");
            return Ok(());
        }
        for c in &candidates {
            println!(
                "{}  {}  {}  {}",
                c.when.format("%Y-%m-%d %H:%M"),
                c.session,
                if c.bead.is_empty() { "-" } else { &c.bead },
                c.editor_session
            );
        }
        return Ok(());
    }

    let target = wt.seance_target(args.name.as_deref())?;
    if args.spawn {
        let name = wt.seance_spawn(&target, args.prompt.as_deref()).await?;
        println!("Resumed {} in session {name}", target.session);
    } else {
        println!("{}", wt.seance_command(&target));
    }
    Ok(())
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
