// SPDX-License-Identifier: MIT

//! The batch epic runner and the standalone audit command.

use anyhow::Result;
use clap::Args;
use std::time::Duration;

use crate::Wt;
use wt_core::MergeMode;
use wt_engine::{audit, AutoOptions, AutoOutcome, BeadAudit, Readiness};

#[derive(Args)]
pub struct AutoArgs {
    /// Epic bead id
    #[arg(long)]
    pub epic: String,
    /// Per-bead timeout in minutes
    #[arg(long, default_value_t = 30)]
    pub timeout_mins: u64,
    /// Override the project's merge mode for the final merge
    #[arg(long)]
    pub merge_mode: Option<String>,
    /// Audit and plan only
    #[arg(long)]
    pub dry_run: bool,
    /// Keep state on failure so `--resume` can continue
    #[arg(long)]
    pub pause_on_failure: bool,
    /// Skip the readiness audit
    #[arg(long)]
    pub skip_audit: bool,
    /// Continue a paused run
    #[arg(long)]
    pub resume: bool,
    /// Discard a paused run without merging
    #[arg(long)]
    pub abort: bool,
    /// Run even when the audit reports NotReady beads
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AuditArgs {
    /// Epic bead id
    pub bead: String,
    /// Interactive: print the suggested questions too
    #[arg(short = 'i', long)]
    pub interactive: bool,
}

fn print_audits(audits: &[BeadAudit], with_questions: bool) {
    for audit in audits {
        let readiness = match audit.readiness {
            Readiness::Ready => "ready",
            Readiness::Partial => "partial",
            Readiness::NotReady => "NOT READY",
        };
        println!("{}  {}  ({} issues)  {}", audit.id, readiness, audit.issue_count(), audit.title);
        for issue in &audit.issues {
            println!("    - {issue}");
        }
        if with_questions {
            for question in &audit.questions {
                println!("    ? {question}");
            }
        }
    }
}

pub async fn auto(wt: &Wt, args: AutoArgs) -> Result<()> {
    let merge_mode = match args.merge_mode.as_deref() {
        Some(s) => Some(s.parse::<MergeMode>().map_err(|e| anyhow::anyhow!(e))?),
        None => None,
    };
    let mut opts = AutoOptions::new(&args.epic);
    opts.timeout = Duration::from_secs(args.timeout_mins * 60);
    opts.merge_mode = merge_mode;
    opts.dry_run = args.dry_run;
    opts.pause_on_failure = args.pause_on_failure;
    opts.skip_audit = args.skip_audit;
    opts.resume = args.resume;
    opts.abort = args.abort;
    opts.force = args.force;

    match wt.auto(opts).await? {
        AutoOutcome::Audited(audits) => {
            print_audits(&audits, false);
            println!("Dry run, nothing started");
        }
        AutoOutcome::Completed { pr_url } => match pr_url {
            Some(url) => println!("Epic {} merged via PR: {url}", args.epic),
            None => println!("Epic {} merged", args.epic),
        },
        AutoOutcome::Paused { bead } => {
            println!("Paused at {bead}; resume with `wt auto --epic {} --resume`", args.epic);
        }
        AutoOutcome::Aborted => println!("Auto run aborted and cleaned up"),
    }
    Ok(())
}

pub async fn audit(wt: &Wt, args: AuditArgs) -> Result<()> {
    let project = wt
        .registry
        .find_by_bead_prefix(&args.bead)?
        .ok_or_else(|| anyhow::anyhow!("no project owns bead '{}'", args.bead))?;
    let (_, audits) = audit::audit_epic(&wt.issues, &project.repo_path, &args.bead).await?;
    print_audits(&audits, args.interactive);
    Ok(())
}
