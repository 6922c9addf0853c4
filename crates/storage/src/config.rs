// SPDX-License-Identifier: MIT

//! User configuration and config-directory path derivation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use wt_core::{Error, MergeMode};

use crate::fsutil;

/// Recognized user options in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory new worktrees are created under.
    pub worktree_root: PathBuf,
    /// Program line for the AI editor; may contain arguments.
    pub editor_cmd: String,
    pub default_merge_mode: MergeMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worktree_root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("worktrees"),
            editor_cmd: "claude".to_string(),
            default_merge_mode: MergeMode::Direct,
        }
    }
}

/// Paths and load/save for everything under the config directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Resolve the config directory: `WT_CONFIG_DIR` when set, else the
    /// platform config dir + `wt`.
    pub fn resolve() -> Result<Self, Error> {
        if let Ok(dir) = std::env::var("WT_CONFIG_DIR") {
            if !dir.is_empty() {
                return Ok(Self::at(fsutil::expand_tilde(&dir)));
            }
        }
        let base = dirs::config_dir()
            .ok_or_else(|| Error::StateCorrupt("no config directory on this platform".into()))?;
        Ok(Self::at(base.join("wt")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.dir.join("sessions.json")
    }

    pub fn sessions_lock_path(&self) -> PathBuf {
        self.dir.join("sessions.lock")
    }

    pub fn namepool_path(&self) -> PathBuf {
        self.dir.join("namepool.txt")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.dir.join("projects")
    }

    pub fn events_path(&self) -> PathBuf {
        self.dir.join("events.log")
    }

    pub fn events_offset_path(&self) -> PathBuf {
        self.dir.join("events.offset")
    }

    pub fn handoff_path(&self) -> PathBuf {
        self.dir.join("handoff.md")
    }

    pub fn handoff_sentinel_path(&self) -> PathBuf {
        self.dir.join("handoff.sentinel")
    }

    /// Archive path for a consumed handoff artifact.
    pub fn handoff_archive_path(&self, timestamp: &str) -> PathBuf {
        self.dir.join(format!("handoff-{timestamp}.md"))
    }

    pub fn auto_sentinel_path(&self) -> PathBuf {
        self.dir.join("auto.sentinel")
    }

    pub fn messages_path(&self) -> PathBuf {
        self.dir.join("messages.db")
    }

    /// Hub-local issue store directory (`bd` with the hub- prefix).
    pub fn hub_beads_dir(&self) -> PathBuf {
        self.dir.join(".beads")
    }

    pub fn exists(&self) -> bool {
        self.config_path().is_file()
    }

    /// Read `config.json` when present, defaults otherwise. Unknown fields
    /// are ignored for forward compatibility.
    pub fn load(&self) -> Result<Config, Error> {
        let path = self.config_path();
        if !path.is_file() {
            return Ok(Config::default());
        }
        let bytes = std::fs::read(&path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::StateCorrupt(format!("{}: {e}", path.display())))
    }

    /// Serialize as indented JSON, temp file + atomic rename.
    pub fn save(&self, config: &Config) -> Result<(), Error> {
        fsutil::atomic_write_json(&self.config_path(), config)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
