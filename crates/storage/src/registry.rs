// SPDX-License-Identifier: MIT

//! Project registry: one JSON record per project under `projects/`.
//!
//! The registry is pure file state; callers supply the repository identity
//! (resolved root, origin URL) probed by the git driver, so this layer has
//! no subprocess dependency.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use wt_core::{Error, MergeMode, Project};

use crate::fsutil;

/// Options for `add`, mirroring the CLI flags.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub branch: Option<String>,
    pub merge_mode: Option<MergeMode>,
}

/// Repository identity as probed by the git driver.
#[derive(Debug, Clone)]
pub struct RepoIdentity {
    /// Canonical work-tree root.
    pub root: PathBuf,
    /// `origin` remote URL, empty when absent.
    pub origin_url: String,
}

/// Embedded issue-store config, read for the bead prefix.
#[derive(Debug, Deserialize)]
struct BeadsConfig {
    #[serde(default)]
    prefix: String,
}

#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    dir: PathBuf,
}

impl ProjectRegistry {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn project_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// All projects in name order.
    pub fn list(&self) -> Result<Vec<Project>, Error> {
        let mut projects = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(projects),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = std::fs::read(&path)?;
            match serde_json::from_slice::<Project>(&bytes) {
                Ok(project) => projects.push(project),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable project record");
                }
            }
        }
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    pub fn get(&self, name: &str) -> Result<Project, Error> {
        let path = self.project_path(name);
        if !path.is_file() {
            return Err(Error::ProjectNotFound(name.to_string()));
        }
        let bytes = std::fs::read(&path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::StateCorrupt(format!("{}: {e}", path.display())))
    }

    /// Register a project. `identity` carries the probed repo root and
    /// origin URL; the bead prefix is read from the repo's embedded
    /// issue-store config, falling back to the project name.
    ///
    /// Enforced invariants: unique project name; a (repo URL, default
    /// branch) pair registered once; all projects sharing a repo URL share
    /// one bead prefix.
    pub fn add(
        &self,
        name: &str,
        identity: &RepoIdentity,
        opts: AddOptions,
    ) -> Result<Project, Error> {
        if self.project_path(name).is_file() {
            return Err(Error::ExistingProject(name.to_string()));
        }

        let default_branch = opts.branch.unwrap_or_else(|| "main".to_string());
        let bead_prefix = read_bead_prefix(&identity.root).unwrap_or_else(|| name.to_string());

        for existing in self.list()? {
            if existing.repo_url.is_empty() || identity.origin_url.is_empty() {
                continue;
            }
            if existing.repo_url != identity.origin_url {
                continue;
            }
            if existing.default_branch == default_branch {
                return Err(Error::RepoBranchConflict {
                    url: identity.origin_url.clone(),
                    branch: default_branch,
                    existing: existing.name,
                });
            }
            if existing.bead_prefix != bead_prefix {
                return Err(Error::BeadPrefixMismatch {
                    url: identity.origin_url.clone(),
                    expected: existing.bead_prefix,
                    got: bead_prefix,
                });
            }
        }

        let mut project = Project::new(name, identity.root.clone());
        project.repo_url = identity.origin_url.clone();
        project.default_branch = default_branch;
        project.bead_prefix = bead_prefix;
        if let Some(mode) = opts.merge_mode {
            project.merge_mode = mode;
        }

        self.save(&project)?;
        Ok(project)
    }

    /// Persist a (possibly mutated) project record.
    pub fn save(&self, project: &Project) -> Result<(), Error> {
        fsutil::atomic_write_json(&self.project_path(&project.name), project)
    }

    pub fn delete(&self, name: &str) -> Result<(), Error> {
        let path = self.project_path(name);
        if !path.is_file() {
            return Err(Error::ProjectNotFound(name.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Project owning a bead id. The prefix is every dash-separated part
    /// except the last; exact `bead_prefix` matches win over name matches.
    pub fn find_by_bead_prefix(&self, bead: &str) -> Result<Option<Project>, Error> {
        let prefix = match bead.rsplit_once('-') {
            Some((prefix, _)) => prefix,
            None => return Ok(None),
        };
        let projects = self.list()?;
        if let Some(p) = projects.iter().find(|p| p.bead_prefix == prefix) {
            return Ok(Some(p.clone()));
        }
        Ok(projects.into_iter().find(|p| p.name == prefix))
    }

    pub fn find_by_repo_url(&self, url: &str) -> Result<Option<Project>, Error> {
        if url.is_empty() {
            return Ok(None);
        }
        Ok(self.list()?.into_iter().find(|p| p.repo_url == url))
    }
}

/// Read the bead prefix from `<repo>/.beads/config.json`, if present.
fn read_bead_prefix(repo_root: &Path) -> Option<String> {
    let path = repo_root.join(".beads").join("config.json");
    let bytes = std::fs::read(path).ok()?;
    let config: BeadsConfig = serde_json::from_slice(&bytes).ok()?;
    if config.prefix.is_empty() {
        None
    } else {
        Some(config.prefix)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
