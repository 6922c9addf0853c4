// SPDX-License-Identifier: MIT

//! Project administration and bead queries.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use crate::output::OutputFormat;
use crate::Wt;
use wt_adapters::{git, BeadCreate, IssueStore};
use wt_core::MergeMode;
use wt_storage::registry::RepoIdentity;
use wt_storage::{expand_tilde, AddOptions};

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Register a project
    Add {
        name: String,
        /// Repository path (~ allowed)
        path: String,
        /// Default branch (base for worktrees and merges)
        #[arg(long, default_value = "main")]
        branch: String,
        /// Merge mode: direct, pr-auto, pr-review
        #[arg(long)]
        merge_mode: Option<String>,
    },
    /// Show a project's record
    Config { name: String },
    /// Remove a project (must have no active sessions)
    Remove { name: String },
}

#[derive(Args)]
pub struct ReadyArgs {
    /// Project name (default: all projects)
    pub project: Option<String>,
}

#[derive(Args)]
pub struct BeadsArgs {
    pub project: String,
    /// Filter by status
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    pub project: String,
    pub title: String,
    /// Issue type
    #[arg(long = "type")]
    pub issue_type: Option<String>,
    /// Priority (omit to use the store default)
    #[arg(long)]
    pub priority: Option<i64>,
    #[arg(long)]
    pub description: Option<String>,
}

pub fn projects(wt: &Wt, format: OutputFormat) -> Result<()> {
    let projects = wt.registry.list()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&projects)?),
        OutputFormat::Text => {
            if projects.is_empty() {
                println!("No projects registered (see `wt project add`)");
            }
            for project in projects {
                println!(
                    "{}  {}  [{}]  prefix={}",
                    project.name,
                    project.repo_path.display(),
                    project.merge_mode,
                    project.bead_prefix
                );
            }
        }
    }
    Ok(())
}

pub async fn project(wt: &Wt, args: ProjectArgs) -> Result<()> {
    match args.command {
        ProjectCommand::Add { name, path, branch, merge_mode } => {
            let path = expand_tilde(&path);
            // The path must be a git work tree; identity comes from git.
            let root = git::find_git_root(&path).await?;
            let origin_url = git::origin_url(&root).await?;
            let merge_mode = match merge_mode.as_deref() {
                Some(s) => Some(s.parse::<MergeMode>().map_err(|e| anyhow::anyhow!(e))?),
                None => None,
            };
            let project = wt.registry.add(
                &name,
                &RepoIdentity { root, origin_url },
                AddOptions { branch: Some(branch), merge_mode },
            )?;
            println!("Registered {} ({} on {})", project.name, project.repo_path.display(), project.default_branch);
        }
        ProjectCommand::Config { name } => {
            let project = wt.registry.get(&name)?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        ProjectCommand::Remove { name } => {
            let sessions = wt.sessions.load()?;
            if sessions.values().any(|s| s.project == name) {
                bail!("project '{name}' has active sessions");
            }
            wt.registry.delete(&name)?;
            println!("Removed project {name}");
        }
    }
    Ok(())
}

pub async fn ready(wt: &Wt, args: ReadyArgs, format: OutputFormat) -> Result<()> {
    let projects = match &args.project {
        Some(name) => vec![wt.registry.get(name)?],
        None => wt.registry.list()?,
    };
    for project in projects {
        let beads = wt.issues.ready(&project.repo_path).await.map_err(wt_core::Error::from)?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "project": project.name,
                "ready": beads.iter().map(|b| &b.id).collect::<Vec<_>>(),
            }))?),
            OutputFormat::Text => {
                for bead in beads {
                    println!("{}  {}  {}", project.name, bead.id, bead.title);
                }
            }
        }
    }
    Ok(())
}

pub async fn beads(wt: &Wt, args: BeadsArgs, format: OutputFormat) -> Result<()> {
    let project = wt.registry.get(&args.project)?;
    let beads = wt
        .issues
        .list(&project.repo_path, args.status.as_deref())
        .await
        .map_err(wt_core::Error::from)?;
    match format {
        OutputFormat::Json => {
            let ids: Vec<serde_json::Value> = beads
                .iter()
                .map(|b| serde_json::json!({"id": b.id, "title": b.title, "status": b.status}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&ids)?);
        }
        OutputFormat::Text => {
            for bead in beads {
                println!("{}  [{}]  {}", bead.id, bead.status, bead.title);
            }
        }
    }
    Ok(())
}

pub async fn create(wt: &Wt, args: CreateArgs) -> Result<()> {
    let project = wt.registry.get(&args.project)?;
    let id = wt
        .issues
        .create(
            &project.repo_path,
            BeadCreate {
                title: args.title,
                issue_type: args.issue_type,
                priority: args.priority,
                description: args.description,
            },
        )
        .await
        .map_err(wt_core::Error::from)?;
    println!("Created {id}");
    Ok(())
}
