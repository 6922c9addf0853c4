// SPDX-License-Identifier: MIT

//! Shared fixture for engine tests: an orchestrator wired to fakes and a
//! tempdir-backed config directory.

use std::path::Path;
use tempfile::TempDir;

use crate::orchestrator::Orchestrator;
use wt_adapters::{FakeIssueStore, FakeMergeDriver, FakeMultiplexer, FakeNotifyAdapter};
use wt_core::{FakeClock, MergeMode, Project, Session};
use wt_storage::{AddOptions, Config, ConfigStore};
use wt_storage::registry::RepoIdentity;

pub(crate) type TestOrchestrator =
    Orchestrator<FakeMultiplexer, FakeIssueStore, FakeMergeDriver, FakeNotifyAdapter, FakeClock>;

pub(crate) struct Fix {
    pub dir: TempDir,
    pub repo: TempDir,
    pub orc: TestOrchestrator,
}

/// Orchestrator over fakes with one registered project `demo` (bead
/// prefix `dm`, direct merge) whose repo is a plain tempdir. Call
/// `init_repo` on it for tests that exercise real git.
pub(crate) fn fixture() -> Fix {
    let dir = TempDir::new().unwrap();
    let repo = TempDir::new().unwrap();

    std::fs::create_dir_all(repo.path().join(".beads")).unwrap();
    std::fs::write(repo.path().join(".beads/config.json"), r#"{"prefix":"dm"}"#).unwrap();

    let paths = ConfigStore::at(dir.path().join("config"));
    let config = Config {
        worktree_root: dir.path().join("worktrees"),
        editor_cmd: "claude".to_string(),
        default_merge_mode: MergeMode::Direct,
    };

    let orc = Orchestrator::new(
        paths,
        config,
        FakeMultiplexer::new(),
        FakeIssueStore::new(),
        FakeMergeDriver::new(),
        FakeNotifyAdapter::new(),
        FakeClock::new(),
    );

    orc.registry
        .add(
            "demo",
            &RepoIdentity { root: repo.path().to_path_buf(), origin_url: String::new() },
            AddOptions::default(),
        )
        .unwrap();

    Fix { dir, repo, orc }
}

/// Mutate the registered `demo` project.
pub(crate) fn update_project(fix: &Fix, f: impl FnOnce(&mut Project)) {
    let mut project = fix.orc.registry.get("demo").unwrap();
    f(&mut project);
    fix.orc.registry.save(&project).unwrap();
}

/// Insert a session record whose worktree is a real (plain) directory, so
/// cleanup paths can delete it.
pub(crate) fn insert_session(fix: &Fix, mut session: Session) -> Session {
    let worktree = fix.dir.path().join("worktrees").join(&session.name);
    std::fs::create_dir_all(&worktree).unwrap();
    session.worktree = worktree;
    session.project = "demo".to_string();
    let stored = session.clone();
    fix.orc
        .sessions
        .with_lock(|sessions| {
            sessions.insert(session.name.clone(), session);
            Ok(())
        })
        .unwrap();
    // The fake multiplexer mirrors the live session.
    fix.orc.mux.add_session(&stored.name);
    stored
}

/// Check if git is available on this system
pub(crate) fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Initialize a repo with one commit on `main`.
pub(crate) fn init_repo(dir: &Path) {
    let script = "git init -q -b main . \
         && git config user.email wt@example.com \
         && git config user.name wt \
         && echo seed > seed.txt \
         && git add . && git commit -q -m seed";
    let status = std::process::Command::new("sh")
        .args(["-c", script])
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .status()
        .unwrap();
    assert!(status.success(), "git fixture setup failed");
}
