// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wt: parallel AI-agent coding sessions in git worktrees.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use wt_adapters::issue::BdIssueStore;
use wt_adapters::merge::GhMergeDriver;
use wt_adapters::multiplexer::TmuxMultiplexer;
use wt_adapters::notify::DesktopNotifyAdapter;
use wt_core::SystemClock;
use wt_engine::Orchestrator;
use wt_storage::ConfigStore;

pub(crate) type Wt =
    Orchestrator<TmuxMultiplexer, BdIssueStore, GhMergeDriver, DesktopNotifyAdapter, SystemClock>;

#[derive(Parser)]
#[command(name = "wt", version, about = "Parallel AI-agent coding sessions in git worktrees")]
struct Cli {
    /// Machine-readable output on list-style commands
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print active sessions
    List,
    /// Create a session for a bead
    New(commands::session::NewArgs),
    /// Create a task session not tied to any bead
    Task(commands::session::TaskArgs),
    /// Terminate a session, keeping its bead open
    Kill(commands::session::KillArgs),
    /// Terminate a session and close its bead
    Close(commands::session::CloseArgs),
    /// Complete the current session (merge, close bead, clean up)
    Done(commands::session::DoneArgs),
    /// Discard the current session without merging
    Abandon,
    /// Report on the current session
    Status,
    /// Update the current session's status
    Signal(commands::session::SignalArgs),
    /// Live dashboard with OS notifications on transitions
    Watch,
    /// Query or follow the event log
    Events(commands::events::EventsArgs),
    /// Resume a past editor session by its recorded id
    Seance(commands::events::SeanceArgs),
    /// List registered projects
    Projects,
    /// Project administration
    Project(commands::project::ProjectArgs),
    /// Ready beads for a project (or all projects)
    Ready(commands::project::ReadyArgs),
    /// List a project's beads
    Beads(commands::project::BeadsArgs),
    /// Create a bead in a project
    Create(commands::project::CreateArgs),
    /// Batch-process an epic in a single worktree
    Auto(commands::auto::AutoArgs),
    /// Readiness audit for an epic
    Audit(commands::auto::AuditArgs),
    /// Bead operations from inside a session
    Bead(commands::hub::BeadArgs),
    /// Worker ↔ hub mailbox
    Msg(commands::hub::MsgArgs),
    /// Capture hub context before an editor restart
    Handoff(commands::hub::HandoffArgs),
    /// Re-seed context after an editor restart
    Prime(commands::hub::PrimeArgs),
    /// Hub session management
    Hub(commands::hub::HubArgs),
    /// Show or edit configuration
    Config(commands::ops::ConfigArgs),
    /// Check external tools and state health
    Doctor,
    /// Attach or switch to a session by name
    #[command(external_subcommand)]
    Attach(Vec<String>),
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("WT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn orchestrator() -> anyhow::Result<Wt> {
    let paths = ConfigStore::resolve()?;
    let config = paths.load()?;
    Ok(Orchestrator::new(
        paths,
        config,
        TmuxMultiplexer::new(),
        BdIssueStore::new(),
        GhMergeDriver::new(),
        DesktopNotifyAdapter::new(),
        SystemClock,
    ))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = output::OutputFormat::from_json_flag(cli.json);
    let wt = orchestrator()?;

    match cli.command {
        Command::List => commands::session::list(&wt, format).await,
        Command::New(args) => commands::session::new(&wt, args).await,
        Command::Task(args) => commands::session::task(&wt, args).await,
        Command::Kill(args) => commands::session::kill(&wt, args).await,
        Command::Close(args) => commands::session::close(&wt, args).await,
        Command::Done(args) => commands::session::done(&wt, args).await,
        Command::Abandon => commands::session::abandon(&wt).await,
        Command::Status => commands::session::status(&wt, format).await,
        Command::Signal(args) => commands::session::signal(&wt, args).await,
        Command::Watch => commands::events::watch(&wt).await,
        Command::Events(args) => commands::events::events(&wt, args, format).await,
        Command::Seance(args) => commands::events::seance(&wt, args).await,
        Command::Projects => commands::project::projects(&wt, format),
        Command::Project(args) => commands::project::project(&wt, args).await,
        Command::Ready(args) => commands::project::ready(&wt, args, format).await,
        Command::Beads(args) => commands::project::beads(&wt, args, format).await,
        Command::Create(args) => commands::project::create(&wt, args).await,
        Command::Auto(args) => commands::auto::auto(&wt, args).await,
        Command::Audit(args) => commands::auto::audit(&wt, args).await,
        Command::Bead(args) => commands::hub::bead(&wt, args).await,
        Command::Msg(args) => commands::hub::msg(&wt, args).await,
        Command::Handoff(args) => commands::hub::handoff(&wt, args).await,
        Command::Prime(args) => commands::hub::prime(&wt, args).await,
        Command::Hub(args) => commands::hub::hub(&wt, args).await,
        Command::Config(args) => commands::ops::config(&wt, args),
        Command::Doctor => commands::ops::doctor(&wt).await,
        Command::Attach(raw) => commands::session::attach(&wt, raw).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("wt: {e}");
            ExitCode::FAILURE
        }
    }
}
