// SPDX-License-Identifier: MIT

//! Hub glue: handoff/prime, the hub session, and in-session bead creation.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use crate::Wt;
use wt_adapters::multiplexer::NewSessionOptions;
use wt_adapters::{BeadCreate, IssueStore, Multiplexer};
use wt_core::Clock;
use wt_engine::HandoffOptions;

/// Name of the hub's multiplexer session.
const HUB_SESSION: &str = "hub";

#[derive(Args)]
pub struct HandoffArgs {
    /// Note placed at the top of the artifact
    #[arg(short = 'm', long)]
    pub message: Option<String>,
    /// Restart the editor in the hub session after the handoff
    #[arg(short = 'c', long)]
    pub cycle: bool,
    /// Assemble and print without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct PrimeArgs {
    /// Stay silent when there is nothing to prime
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct HubArgs {
    /// Create the hub session detached
    #[arg(short = 'd', long)]
    pub detach: bool,
    /// Kill the hub session
    #[arg(short = 'k', long)]
    pub kill: bool,
}

#[derive(Args)]
pub struct MsgArgs {
    #[command(subcommand)]
    pub command: MsgCommand,
}

#[derive(Subcommand)]
pub enum MsgCommand {
    /// Send a message to a session's mailbox
    Send {
        /// Recipient session name (or "hub")
        to: String,
        /// Subject: TASK, DONE, STUCK, PROGRESS
        subject: String,
        body: String,
        /// Thread id to group replies
        #[arg(long)]
        thread: Option<String>,
    },
    /// Print unacked messages for the current session (or --as hub)
    Recv {
        /// Read a mailbox other than the current session's
        #[arg(long = "as")]
        mailbox: Option<String>,
        /// Filter by subject
        #[arg(long)]
        subject: Option<String>,
    },
    /// Acknowledge a message so recv stops returning it
    Ack { id: String },
    /// Print every message in a thread
    Thread { id: String },
}

#[derive(Args)]
pub struct BeadArgs {
    #[command(subcommand)]
    pub command: BeadCommand,
}

#[derive(Subcommand)]
pub enum BeadCommand {
    /// Create a bead in the current session's project
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
}

pub async fn handoff(wt: &Wt, args: HandoffArgs) -> Result<()> {
    let body = wt
        .handoff(HandoffOptions { message: args.message, dry_run: args.dry_run })
        .await?;
    if args.dry_run {
        print!("{body}");
        return Ok(());
    }
    println!("Handoff written; restart the editor and run `wt prime`");

    if args.cycle {
        // Restart the editor inside the hub session.
        if wt.mux.session_exists(HUB_SESSION).await {
            wt.mux.kill(HUB_SESSION).await?;
        }
        spawn_hub(wt).await?;
        println!("Hub editor restarted");
    }
    Ok(())
}

pub async fn prime(wt: &Wt, args: PrimeArgs) -> Result<()> {
    match wt.prime().await? {
        Some(_) => println!("Handoff context injected"),
        None => {
            if !args.quiet {
                println!("No handoff pending");
            }
        }
    }
    Ok(())
}

async fn spawn_hub(wt: &Wt) -> Result<()> {
    let workdir = wt.paths.dir().to_path_buf();
    let beads_dir = wt.paths.hub_beads_dir();
    wt.mux
        .new_session(
            HUB_SESSION,
            &workdir,
            &beads_dir,
            &wt.config.editor_cmd,
            NewSessionOptions::default(),
        )
        .await?;
    Ok(())
}

pub async fn hub(wt: &Wt, args: HubArgs) -> Result<()> {
    if args.kill {
        wt.mux.kill(HUB_SESSION).await?;
        println!("Hub session killed");
        return Ok(());
    }

    if !wt.mux.session_exists(HUB_SESSION).await {
        spawn_hub(wt).await?;
        println!("Hub session created");
    }
    if !args.detach {
        match wt.mux.current_session().await {
            Ok(current) if !current.is_empty() => wt.mux.switch_client(HUB_SESSION).await?,
            _ => wt.mux.attach(HUB_SESSION).await?,
        }
    }
    Ok(())
}

/// The mailbox identity of the caller: the current session, else "hub".
fn msg_identity(wt: &Wt) -> String {
    super::current_session(wt).map(|s| s.name).unwrap_or_else(|_| "hub".to_string())
}

pub async fn msg(wt: &Wt, args: MsgArgs) -> Result<()> {
    match args.command {
        MsgCommand::Send { to, subject, body, thread } => {
            let subject: wt_core::Subject =
                subject.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let from = msg_identity(wt);
            let message =
                wt.mailbox.send(wt.clock.now_utc(), subject, &from, &to, &body, thread)?;
            println!("Sent {} ({})", message.id, message.subject);
        }
        MsgCommand::Recv { mailbox, subject } => {
            let to = mailbox.unwrap_or_else(|| msg_identity(wt));
            let subject = match subject {
                Some(s) => Some(s.parse::<wt_core::Subject>().map_err(|e| anyhow::anyhow!(e))?),
                None => None,
            };
            for message in wt.mailbox.recv(&to, subject)? {
                println!(
                    "{}  {}  from {}: {}",
                    message.id, message.subject, message.from, message.body
                );
            }
        }
        MsgCommand::Ack { id } => {
            if wt.mailbox.ack(&id, wt.clock.now_utc())? {
                println!("Acked {id}");
            } else {
                bail!("no unacked message with id '{id}'");
            }
        }
        MsgCommand::Thread { id } => {
            for message in wt.mailbox.thread(&id)? {
                let acked = if message.is_acked() { " (acked)" } else { "" };
                println!(
                    "{}  {}  {} → {}{}: {}",
                    message.created_at.format("%H:%M"),
                    message.subject,
                    message.from,
                    message.to,
                    acked,
                    message.body
                );
            }
        }
    }
    Ok(())
}

pub async fn bead(wt: &Wt, args: BeadArgs) -> Result<()> {
    match args.command {
        BeadCommand::Create { title, description } => {
            let session = super::current_session(wt)?;
            let Some(beads_root) = session.beads_dir.parent() else {
                bail!("session has no beads directory");
            };
            let id = wt
                .issues
                .create(
                    beads_root,
                    BeadCreate { title, issue_type: None, priority: None, description },
                )
                .await
                .map_err(wt_core::Error::from)?;
            println!("Created {id}");
        }
    }
    Ok(())
}
