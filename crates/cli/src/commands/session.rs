// SPDX-License-Identifier: MIT

//! Session lifecycle commands: new/task/kill/close/done/abandon/status/
//! signal/attach/list.

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use crate::output::{self, OutputFormat};
use crate::Wt;
use wt_adapters::{IssueStore, Multiplexer};
use wt_core::{Clock, CompletionCondition, MergeMode};
use wt_engine::{DoneOptions, NewOptions, SwitchMode};

#[derive(Args)]
pub struct NewArgs {
    /// Bead id, e.g. dm-42
    pub bead: String,
    /// Repository path (default: the bead's project, or the enclosing repo)
    #[arg(long)]
    pub repo: Option<PathBuf>,
    /// Explicit session name, bypassing the theme pool
    #[arg(long)]
    pub name: Option<String>,
    /// Do not attach or switch after creating
    #[arg(long)]
    pub no_switch: bool,
    /// Switch to the session even from the hub
    #[arg(long)]
    pub switch: bool,
    /// Skip the project's test environment
    #[arg(long)]
    pub no_test_env: bool,
}

#[derive(Args)]
pub struct TaskArgs {
    /// Task description
    pub description: String,
    /// Project to run the task in
    #[arg(long)]
    pub project: Option<String>,
    /// Completion condition: none, pr-merged, pushed, tests-pass, user-confirm
    #[arg(long, default_value = "none")]
    pub condition: String,
    /// Explicit session name, bypassing the theme pool
    #[arg(long)]
    pub name: Option<String>,
    /// Do not attach or switch after creating
    #[arg(long)]
    pub no_switch: bool,
    /// Skip the project's test environment
    #[arg(long)]
    pub no_test_env: bool,
}

#[derive(Args)]
pub struct KillArgs {
    /// Session name
    pub name: String,
    /// Keep the worktree on disk
    #[arg(long)]
    pub keep_worktree: bool,
}

#[derive(Args)]
pub struct CloseArgs {
    /// Session name
    pub name: String,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Override the project's merge mode: direct, pr-auto, pr-review
    #[arg(long)]
    pub merge_mode: Option<String>,
    /// Rebase onto the default branch if the merge hits a conflict
    #[arg(long)]
    pub rebase: bool,
    /// Assent for the user-confirm completion condition
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args)]
pub struct SignalArgs {
    /// One of: working, ready, blocked, error, idle
    pub status: String,
    /// Optional status message
    pub message: Option<String>,
}

/// Switch mode from the flags and environment: inside the hub
/// (`WT_HUB=1`) sessions stay detached unless `--switch` insists; inside
/// the multiplexer a switch is used, outside an attach.
async fn resolve_switch(wt: &Wt, no_switch: bool, force_switch: bool) -> SwitchMode {
    if no_switch {
        return SwitchMode::None;
    }
    let in_hub = std::env::var("WT_HUB").map(|v| v == "1").unwrap_or(false);
    if in_hub && !force_switch {
        return SwitchMode::None;
    }
    match wt.mux.current_session().await {
        Ok(name) if !name.is_empty() => SwitchMode::Switch,
        _ => SwitchMode::Attach,
    }
}

pub async fn list(wt: &Wt, format: OutputFormat) -> Result<()> {
    let sessions = wt.sessions.load()?;
    let sessions: Vec<_> = sessions.into_values().collect();
    match format {
        OutputFormat::Text => output::print_sessions(&sessions, wt.clock.now_utc()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sessions)?),
    }
    Ok(())
}

pub async fn new(wt: &Wt, args: NewArgs) -> Result<()> {
    let switch = resolve_switch(wt, args.no_switch, args.switch).await;
    let opts = NewOptions {
        repo: args.repo,
        name: args.name,
        switch,
        no_test_env: args.no_test_env,
    };
    let session = wt.new_bead_session(&args.bead, opts).await?;
    println!("Created session {} for {} at {}", session.name, args.bead, session.worktree.display());
    Ok(())
}

pub async fn task(wt: &Wt, args: TaskArgs) -> Result<()> {
    let condition: CompletionCondition =
        args.condition.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let switch = resolve_switch(wt, args.no_switch, false).await;
    let opts = NewOptions {
        repo: None,
        name: args.name,
        switch,
        no_test_env: args.no_test_env,
    };
    let session =
        wt.new_task_session(&args.description, condition, args.project.as_deref(), opts).await?;
    println!("Created task session {} at {}", session.name, session.worktree.display());
    Ok(())
}

pub async fn kill(wt: &Wt, args: KillArgs) -> Result<()> {
    wt.kill(&args.name, args.keep_worktree).await?;
    println!("Killed session {} (bead left open)", args.name);
    Ok(())
}

/// Close = kill the session, then close its bead in the issue store.
pub async fn close(wt: &Wt, args: CloseArgs) -> Result<()> {
    let sessions = wt.sessions.load()?;
    let Some(session) = sessions.get(&args.name).cloned() else {
        bail!("no session named '{}'", args.name);
    };
    let bead = session.bead().map(str::to_string);

    wt.kill(&args.name, false).await?;
    if let Some(bead) = bead {
        let project = wt.project_for_session(&session)?;
        wt.issues.close(&project.repo_path, &bead).await.map_err(wt_core::Error::from)?;
        println!("Killed session {} and closed {bead}", args.name);
    } else {
        println!("Killed task session {}", args.name);
    }
    Ok(())
}

pub async fn done(wt: &Wt, args: DoneArgs) -> Result<()> {
    let session = super::current_session(wt)?;
    let merge_mode = match args.merge_mode.as_deref() {
        Some(s) => Some(s.parse::<MergeMode>().map_err(|e| anyhow::anyhow!(e))?),
        None => None,
    };
    let opts = DoneOptions {
        merge_mode,
        rebase_consent: args.rebase.then_some(true),
        user_confirmed: args.yes,
    };
    let report = wt.done(&session.name, opts).await?;
    match report.pr_url {
        Some(url) => println!("Done: {} via {}: {url}", session.name, report.merge_mode),
        None => println!("Done: {} merged via {}", session.name, report.merge_mode),
    }
    Ok(())
}

pub async fn abandon(wt: &Wt) -> Result<()> {
    let session = super::current_session(wt)?;
    wt.abandon(&session.name).await?;
    println!("Abandoned session {} (bead left open)", session.name);
    Ok(())
}

pub async fn status(wt: &Wt, format: OutputFormat) -> Result<()> {
    let session = super::current_session(wt)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&session)?),
        OutputFormat::Text => {
            let derived = wt.derived_status(&session).await;
            println!("session:  {}", session.name);
            println!("project:  {}", session.project);
            println!("unit:     {}", session.bead().unwrap_or("task"));
            println!("branch:   {}", session.branch);
            println!("worktree: {}", session.worktree.display());
            println!("status:   {derived}");
            if let Some(message) = &session.status_message {
                println!("note:     {message}");
            }
            if session.port_offset > 0 {
                println!("offset:   {}", session.port_offset);
            }
        }
    }
    Ok(())
}

pub async fn signal(wt: &Wt, args: SignalArgs) -> Result<()> {
    let session = super::current_session(wt)?;
    let status = wt.signal(&session.name, &args.status, args.message)?;
    println!("{} → {status}", session.name);
    Ok(())
}

/// Bare `wt <name>`: attach from outside the multiplexer, switch inside.
pub async fn attach(wt: &Wt, raw: Vec<String>) -> Result<()> {
    let Some(name) = raw.first() else {
        bail!("no session name given");
    };
    if !wt.mux.session_exists(name).await {
        bail!("no session named '{name}' (see `wt list`)");
    }
    match wt.mux.current_session().await {
        Ok(current) if !current.is_empty() => wt.mux.switch_client(name).await?,
        _ => wt.mux.attach(name).await?,
    }
    Ok(())
}
