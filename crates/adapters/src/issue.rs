// SPDX-License-Identifier: MIT

//! Issue-store driver for the external `bd` CLI.
//!
//! `bd` is a contract, not an implementation: stable subcommands with
//! `--json` output. `bd show --json` may emit an object or a one-element
//! array; both shapes are accepted.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

use crate::subprocess::{self, run_with_timeout, BD_TIMEOUT};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("bead '{0}' not found")]
    NotFound(String),

    #[error("issue store command failed: {0}")]
    Failed(String),

    #[error("required external command '{0}' is missing")]
    CliMissing(String),
}

impl From<IssueError> for wt_core::Error {
    fn from(e: IssueError) -> Self {
        match e {
            IssueError::NotFound(id) => wt_core::Error::BeadNotFound(id),
            IssueError::Failed(msg) => wt_core::Error::IssueStoreFailed(msg),
            IssueError::CliMissing(program) => wt_core::Error::ExternalCliMissing(program),
        }
    }
}

/// One bead as reported by `bd`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Bead {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "issue_type")]
    pub issue_type: String,
    #[serde(default)]
    pub priority: Option<i64>,
    /// Bead ids this bead depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Fields for `bd create`. An unset priority is omitted so the store
/// applies its own default.
#[derive(Debug, Clone, Default)]
pub struct BeadCreate {
    pub title: String,
    pub issue_type: Option<String>,
    pub priority: Option<i64>,
    pub description: Option<String>,
}

#[async_trait]
pub trait IssueStore: Send + Sync + 'static {
    /// `bd show <id> --json`. `dir` selects which store (repo or hub) the
    /// command runs against.
    async fn show(&self, dir: &Path, id: &str) -> Result<Bead, IssueError>;

    /// `bd list [--status <s>] --json`.
    async fn list(&self, dir: &Path, status: Option<&str>) -> Result<Vec<Bead>, IssueError>;

    /// `bd list --ready --json`.
    async fn ready(&self, dir: &Path) -> Result<Vec<Bead>, IssueError>;

    /// `bd dep list <id> --json`: the bead's direct dependencies.
    async fn deps(&self, dir: &Path, id: &str) -> Result<Vec<Bead>, IssueError>;

    async fn update_description(&self, dir: &Path, id: &str, text: &str)
        -> Result<(), IssueError>;

    async fn update_status(&self, dir: &Path, id: &str, status: &str) -> Result<(), IssueError>;

    async fn close(&self, dir: &Path, id: &str) -> Result<(), IssueError>;

    /// `bd create …` returning the new bead id.
    async fn create(&self, dir: &Path, fields: BeadCreate) -> Result<String, IssueError>;

    /// `bd init --prefix <p>`.
    async fn init(&self, dir: &Path, prefix: &str) -> Result<(), IssueError>;
}

/// Decode `bd … --json` output that may be an object or a one-element
/// array. The array form is tried first.
pub fn decode_bead(json: &str) -> Result<Bead, IssueError> {
    if let Ok(mut beads) = serde_json::from_str::<Vec<Bead>>(json) {
        let count = beads.len();
        if let (Some(bead), 1) = (beads.pop(), count) {
            return Ok(bead);
        }
        return Err(IssueError::Failed(format!("expected one bead, got {count} entries")));
    }
    serde_json::from_str::<Bead>(json)
        .map_err(|e| IssueError::Failed(format!("unrecognized bead JSON: {e}")))
}

/// Production driver shelling out to `bd`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BdIssueStore;

impl BdIssueStore {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, dir: &Path, args: &[&str], label: &str) -> Result<String, IssueError> {
        let mut cmd = Command::new("bd");
        cmd.args(args).current_dir(dir);
        let output = run_with_timeout(cmd, BD_TIMEOUT, label).await.map_err(|e| match e {
            subprocess::SubprocessError::Missing { program } => IssueError::CliMissing(program),
            other => IssueError::Failed(other.to_string()),
        })?;
        if !output.status.success() {
            return Err(IssueError::Failed(format!(
                "{label}: {}",
                subprocess::stderr_line(&output)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl IssueStore for BdIssueStore {
    async fn show(&self, dir: &Path, id: &str) -> Result<Bead, IssueError> {
        match self.run(dir, &["show", id, "--json"], "bd show").await {
            Ok(json) => decode_bead(&json),
            Err(IssueError::Failed(msg)) if msg.contains("not found") => {
                Err(IssueError::NotFound(id.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn list(&self, dir: &Path, status: Option<&str>) -> Result<Vec<Bead>, IssueError> {
        let json = match status {
            Some(status) => {
                self.run(dir, &["list", "--status", status, "--json"], "bd list").await?
            }
            None => self.run(dir, &["list", "--json"], "bd list").await?,
        };
        serde_json::from_str(&json).map_err(|e| IssueError::Failed(format!("bd list JSON: {e}")))
    }

    async fn ready(&self, dir: &Path) -> Result<Vec<Bead>, IssueError> {
        let json = self.run(dir, &["list", "--ready", "--json"], "bd list --ready").await?;
        serde_json::from_str(&json).map_err(|e| IssueError::Failed(format!("bd list JSON: {e}")))
    }

    async fn deps(&self, dir: &Path, id: &str) -> Result<Vec<Bead>, IssueError> {
        let json = self.run(dir, &["dep", "list", id, "--json"], "bd dep list").await?;
        serde_json::from_str(&json).map_err(|e| IssueError::Failed(format!("bd dep JSON: {e}")))
    }

    async fn update_description(
        &self,
        dir: &Path,
        id: &str,
        text: &str,
    ) -> Result<(), IssueError> {
        self.run(dir, &["update", id, "--description", text], "bd update").await?;
        Ok(())
    }

    async fn update_status(&self, dir: &Path, id: &str, status: &str) -> Result<(), IssueError> {
        self.run(dir, &["update", id, "--status", status], "bd update").await?;
        Ok(())
    }

    async fn close(&self, dir: &Path, id: &str) -> Result<(), IssueError> {
        self.run(dir, &["close", id], "bd close").await?;
        Ok(())
    }

    async fn create(&self, dir: &Path, fields: BeadCreate) -> Result<String, IssueError> {
        let mut args: Vec<String> = vec!["create".into(), "--title".into(), fields.title.clone()];
        if let Some(issue_type) = &fields.issue_type {
            args.push("--type".into());
            args.push(issue_type.clone());
        }
        if let Some(priority) = fields.priority {
            args.push("--priority".into());
            args.push(priority.to_string());
        }
        if let Some(description) = &fields.description {
            args.push("--description".into());
            args.push(description.clone());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = self.run(dir, &arg_refs, "bd create").await?;
        // bd prints the created id as the last whitespace-separated token.
        stdout
            .split_whitespace()
            .last()
            .map(str::to_string)
            .ok_or_else(|| IssueError::Failed("bd create printed no id".into()))
    }

    async fn init(&self, dir: &Path, prefix: &str) -> Result<(), IssueError> {
        self.run(dir, &["init", "--prefix", prefix], "bd init").await?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Bead, BeadCreate, IssueError, IssueStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Arc;

    /// Recorded issue-store mutation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum IssueCall {
        UpdateDescription { id: String, text: String },
        UpdateStatus { id: String, status: String },
        Close(String),
        Create { title: String },
        Init { prefix: String },
    }

    #[derive(Default)]
    struct FakeState {
        beads: BTreeMap<String, Bead>,
        calls: Vec<IssueCall>,
        next_id: u32,
    }

    /// In-memory issue store for engine tests.
    #[derive(Clone, Default)]
    pub struct FakeIssueStore {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeIssueStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put(&self, bead: Bead) {
            self.inner.lock().beads.insert(bead.id.clone(), bead);
        }

        /// Convenience: insert an open bead with a title and description.
        pub fn put_simple(&self, id: &str, title: &str, description: &str) {
            self.put(Bead {
                id: id.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                status: "open".to_string(),
                issue_type: "task".to_string(),
                priority: None,
                dependencies: Vec::new(),
            });
        }

        pub fn calls(&self) -> Vec<IssueCall> {
            self.inner.lock().calls.clone()
        }

        pub fn status_of(&self, id: &str) -> Option<String> {
            self.inner.lock().beads.get(id).map(|b| b.status.clone())
        }
    }

    #[async_trait]
    impl IssueStore for FakeIssueStore {
        async fn show(&self, _dir: &Path, id: &str) -> Result<Bead, IssueError> {
            self.inner
                .lock()
                .beads
                .get(id)
                .cloned()
                .ok_or_else(|| IssueError::NotFound(id.to_string()))
        }

        async fn list(&self, _dir: &Path, status: Option<&str>) -> Result<Vec<Bead>, IssueError> {
            Ok(self
                .inner
                .lock()
                .beads
                .values()
                .filter(|b| status.is_none_or(|s| b.status == s))
                .cloned()
                .collect())
        }

        async fn ready(&self, dir: &Path) -> Result<Vec<Bead>, IssueError> {
            // Ready = open with no open dependencies.
            let open = self.list(dir, Some("open")).await?;
            let state = self.inner.lock();
            Ok(open
                .into_iter()
                .filter(|b| {
                    b.dependencies.iter().all(|d| {
                        state.beads.get(d).map(|dep| dep.status == "closed").unwrap_or(false)
                    })
                })
                .collect())
        }

        async fn deps(&self, _dir: &Path, id: &str) -> Result<Vec<Bead>, IssueError> {
            let state = self.inner.lock();
            let bead = state
                .beads
                .get(id)
                .ok_or_else(|| IssueError::NotFound(id.to_string()))?;
            Ok(bead
                .dependencies
                .iter()
                .filter_map(|d| state.beads.get(d).cloned())
                .collect())
        }

        async fn update_description(
            &self,
            _dir: &Path,
            id: &str,
            text: &str,
        ) -> Result<(), IssueError> {
            let mut state = self.inner.lock();
            state
                .calls
                .push(IssueCall::UpdateDescription { id: id.to_string(), text: text.to_string() });
            match state.beads.get_mut(id) {
                Some(bead) => {
                    bead.description = text.to_string();
                    Ok(())
                }
                None => Err(IssueError::NotFound(id.to_string())),
            }
        }

        async fn update_status(
            &self,
            _dir: &Path,
            id: &str,
            status: &str,
        ) -> Result<(), IssueError> {
            let mut state = self.inner.lock();
            state
                .calls
                .push(IssueCall::UpdateStatus { id: id.to_string(), status: status.to_string() });
            match state.beads.get_mut(id) {
                Some(bead) => {
                    bead.status = status.to_string();
                    Ok(())
                }
                None => Err(IssueError::NotFound(id.to_string())),
            }
        }

        async fn close(&self, _dir: &Path, id: &str) -> Result<(), IssueError> {
            let mut state = self.inner.lock();
            state.calls.push(IssueCall::Close(id.to_string()));
            match state.beads.get_mut(id) {
                Some(bead) => {
                    bead.status = "closed".to_string();
                    Ok(())
                }
                None => Err(IssueError::NotFound(id.to_string())),
            }
        }

        async fn create(&self, _dir: &Path, fields: BeadCreate) -> Result<String, IssueError> {
            let mut state = self.inner.lock();
            state.next_id += 1;
            let id = format!("fake-{}", state.next_id);
            state.calls.push(IssueCall::Create { title: fields.title.clone() });
            state.beads.insert(
                id.clone(),
                Bead {
                    id: id.clone(),
                    title: fields.title,
                    description: fields.description.unwrap_or_default(),
                    status: "open".to_string(),
                    issue_type: fields.issue_type.unwrap_or_else(|| "task".to_string()),
                    priority: fields.priority,
                    dependencies: Vec::new(),
                },
            );
            Ok(id)
        }

        async fn init(&self, _dir: &Path, prefix: &str) -> Result<(), IssueError> {
            self.inner.lock().calls.push(IssueCall::Init { prefix: prefix.to_string() });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeIssueStore, IssueCall};

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
