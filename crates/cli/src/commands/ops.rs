// SPDX-License-Identifier: MIT

//! Configuration and environment health commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use crate::Wt;
use wt_core::MergeMode;
use wt_storage::expand_tilde;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write a default config file if none exists
    Init,
    /// Set one option: worktree_root, editor_cmd, default_merge_mode
    Set { key: String, value: String },
    /// Open the config file in $EDITOR
    Edit,
}

pub fn config(wt: &Wt, args: ConfigArgs) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => {
            println!("config dir: {}", wt.paths.dir().display());
            println!("{}", serde_json::to_string_pretty(&wt.config)?);
        }
        ConfigCommand::Init => {
            if wt.paths.exists() {
                bail!("config already exists at {}", wt.paths.config_path().display());
            }
            wt.paths.save(&wt.config)?;
            println!("Wrote {}", wt.paths.config_path().display());
        }
        ConfigCommand::Set { key, value } => {
            let mut config = wt.config.clone();
            match key.as_str() {
                "worktree_root" => config.worktree_root = expand_tilde(&value),
                "editor_cmd" => config.editor_cmd = value,
                "default_merge_mode" => {
                    config.default_merge_mode =
                        value.parse::<MergeMode>().map_err(|e| anyhow::anyhow!(e))?;
                }
                other => bail!("unknown option '{other}'"),
            }
            wt.paths.save(&config)?;
            println!("Saved {}", wt.paths.config_path().display());
        }
        ConfigCommand::Edit => {
            let editor = std::env::var("EDITOR")
                .or_else(|_| std::env::var("VISUAL"))
                .unwrap_or_else(|_| "vi".to_string());
            if !wt.paths.exists() {
                wt.paths.save(&wt.config)?;
            }
            let status = std::process::Command::new(&editor)
                .arg(wt.paths.config_path())
                .status()?;
            if !status.success() {
                bail!("{editor} exited with {status}");
            }
        }
    }
    Ok(())
}

/// Probe one external binary with a `--version`-style invocation.
fn probe(program: &str, arg: &str) -> bool {
    std::process::Command::new(program)
        .arg(arg)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub async fn doctor(wt: &Wt) -> Result<()> {
    let mut healthy = true;
    for (program, arg, required) in [
        ("git", "version", true),
        ("tmux", "-V", true),
        ("bd", "--version", true),
        ("gh", "--version", false),
    ] {
        let ok = probe(program, arg);
        let mark = if ok { "ok " } else if required { "MISSING" } else { "missing (PR modes unavailable)" };
        println!("{program:<6} {mark}");
        if !ok && required {
            healthy = false;
        }
    }

    println!("config {}", wt.paths.dir().display());
    match wt.sessions.load() {
        Ok(sessions) => println!("state  ok ({} sessions)", sessions.len()),
        Err(e) => {
            healthy = false;
            println!("state  CORRUPT: {e}");
        }
    }

    if !healthy {
        bail!("environment problems found");
    }
    Ok(())
}
