// SPDX-License-Identifier: MIT

//! Session-name allocation over the themed pools.

use std::collections::HashSet;
use std::path::Path;

use wt_core::{theme_for_project, Error};

/// An allocated identifier plus the theme it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Unprefixed identifier, stored on the session as `theme_name`.
    pub name: String,
    pub theme: &'static str,
}

/// Allocate the first free identifier from the project's theme.
///
/// The theme is derived from the project name alone, so the same project
/// always draws from the same pool.
pub fn allocate(project: &str, in_use: &HashSet<String>) -> Result<Allocation, Error> {
    let theme = theme_for_project(project);
    theme
        .allocate(in_use)
        .map(|name| Allocation { name: name.to_string(), theme: theme.name })
        .ok_or_else(|| Error::PoolExhausted(theme.name.to_string()))
}

/// Allocate from the file-based fallback pool (`namepool.txt`, one
/// identifier per non-empty line, `#` comments ignored). Used when no
/// project context is available.
pub fn allocate_from_file(path: &Path, in_use: &HashSet<String>) -> Result<Allocation, Error> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .find(|l| !in_use.contains(*l))
        .map(|name| Allocation { name: name.to_string(), theme: "file" })
        .ok_or_else(|| Error::PoolExhausted("file".to_string()))
}

#[cfg(test)]
#[path = "namepool_tests.rs"]
mod tests;
