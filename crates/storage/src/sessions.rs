// SPDX-License-Identifier: MIT

//! Session state store: the map of active sessions in `sessions.json`.
//!
//! Cross-process read-modify-write goes through `with_lock`, which holds an
//! exclusive advisory lock on a sibling lock file across load → mutate →
//! save. Plain reads take a consistent snapshot but not necessarily the
//! newest one.

use fs2::FileExt;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use wt_core::{Error, Session};

use crate::fsutil;

pub type SessionMap = BTreeMap<String, Session>;

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf, lock_path: PathBuf) -> Self {
        Self { path, lock_path }
    }

    /// Read the session map. Missing or empty file yields an empty map.
    pub fn load(&self) -> Result<SessionMap, Error> {
        if !self.path.is_file() {
            return Ok(SessionMap::new());
        }
        let bytes = std::fs::read(&self.path)?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(SessionMap::new());
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::StateCorrupt(format!("{}: {e}", self.path.display())))
    }

    /// Indented JSON, temp file + atomic rename.
    pub fn save(&self, sessions: &SessionMap) -> Result<(), Error> {
        fsutil::atomic_write_json(&self.path, sessions)
    }

    /// Theme identifiers currently in use: the stored `theme_name` when
    /// present, else the session name (state written before theme tracking).
    pub fn used_names(&self) -> Result<HashSet<String>, Error> {
        let sessions = self.load()?;
        Ok(sessions
            .values()
            .map(|s| s.theme_name.clone().unwrap_or_else(|| s.name.clone()))
            .collect())
    }

    /// The active session for a bead id, if any.
    pub fn find_by_bead(&self, bead: &str) -> Result<Option<Session>, Error> {
        let sessions = self.load()?;
        Ok(sessions.into_values().find(|s| s.bead() == Some(bead)))
    }

    /// Run `f` over the session map while holding the advisory lock,
    /// persisting the (possibly mutated) map before releasing it.
    pub fn with_lock<T>(
        &self,
        f: impl FnOnce(&mut SessionMap) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Never truncate: the lock file may be held by another process.
        let lock_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        lock_file.lock_exclusive()?;

        let result = (|| {
            let mut sessions = self.load()?;
            let value = f(&mut sessions)?;
            self.save(&sessions)?;
            Ok(value)
        })();

        let _ = fs2::FileExt::unlock(&lock_file);
        result
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
