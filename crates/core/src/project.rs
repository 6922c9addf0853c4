// SPDX-License-Identifier: MIT

//! Project records persisted by the project registry.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How a session's work reaches the default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    #[default]
    Direct,
    PrAuto,
    PrReview,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeMode::Direct => "direct",
            MergeMode::PrAuto => "pr-auto",
            MergeMode::PrReview => "pr-review",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(MergeMode::Direct),
            "pr-auto" => Ok(MergeMode::PrAuto),
            "pr-review" => Ok(MergeMode::PrReview),
            other => Err(format!("unknown merge mode '{other}'")),
        }
    }
}

/// Rebase-on-merge-conflict policy.
///
/// Serialized as JSON `true` / `false` / `"prompt"` so existing project
/// files with a plain boolean keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoRebase {
    On,
    #[default]
    Off,
    Prompt,
}

impl Serialize for AutoRebase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AutoRebase::On => serializer.serialize_bool(true),
            AutoRebase::Off => serializer.serialize_bool(false),
            AutoRebase::Prompt => serializer.serialize_str("prompt"),
        }
    }
}

impl<'de> Deserialize<'de> for AutoRebase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AutoRebaseVisitor;

        impl Visitor<'_> for AutoRebaseVisitor {
            type Value = AutoRebase;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("true, false or \"prompt\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<AutoRebase, E> {
                Ok(if v { AutoRebase::On } else { AutoRebase::Off })
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<AutoRebase, E> {
                match v {
                    "prompt" => Ok(AutoRebase::Prompt),
                    "true" => Ok(AutoRebase::On),
                    "false" => Ok(AutoRebase::Off),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(AutoRebaseVisitor)
    }
}

/// Optional per-project test sandbox configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEnv {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teardown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<String>,
    /// Environment variable carrying the allocated port offset.
    #[serde(default = "default_port_env")]
    pub port_env: String,
}

fn default_port_env() -> String {
    "PORT_OFFSET".to_string()
}

impl Default for TestEnv {
    fn default() -> Self {
        Self {
            setup: None,
            teardown: None,
            health_check: None,
            port_env: default_port_env(),
        }
    }
}

/// A registered project: one repository + default branch + policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub repo_path: PathBuf,
    /// Canonical `origin` remote URL; empty when the repo has no origin.
    #[serde(default)]
    pub repo_url: String,
    pub default_branch: String,
    /// Bead-id prefix identifying this project's beads, e.g. `wt` for
    /// `wt-abc`.
    pub bead_prefix: String,
    #[serde(default)]
    pub merge_mode: MergeMode,
    #[serde(default)]
    pub auto_rebase: AutoRebase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_env: Option<TestEnv>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_create: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_close: Vec<String>,
    #[serde(default)]
    pub require_ci: bool,
    #[serde(default)]
    pub auto_merge_on_green: bool,
}

impl Project {
    /// Minimal project record; policies default to direct merge, no rebase.
    pub fn new(name: impl Into<String>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            repo_path: repo_path.into(),
            repo_url: String::new(),
            default_branch: "main".to_string(),
            bead_prefix: String::new(),
            merge_mode: MergeMode::default(),
            auto_rebase: AutoRebase::default(),
            test_env: None,
            on_create: Vec::new(),
            on_close: Vec::new(),
            require_ci: false,
            auto_merge_on_green: false,
        }
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
