// SPDX-License-Identifier: MIT

//! Workspace-level scenario tests: full session lifecycles across the
//! storage, adapter and engine crates, with fakes for every external
//! binary except git.

use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

use wt_adapters::{FakeIssueStore, FakeMergeDriver, FakeMultiplexer, FakeNotifyAdapter, Multiplexer};
use wt_core::{theme_for_project, FakeClock, MergeMode, SessionStatus};
use wt_engine::{AutoOptions, AutoOutcome, DoneOptions, NewOptions, Orchestrator};
use wt_storage::registry::RepoIdentity;
use wt_storage::{AddOptions, Config, ConfigStore};

type TestWt =
    Orchestrator<FakeMultiplexer, FakeIssueStore, FakeMergeDriver, FakeNotifyAdapter, FakeClock>;

struct World {
    dir: TempDir,
    /// Held so the project's repository outlives the scenario.
    _repo: TempDir,
    wt: TestWt,
}

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn init_repo(dir: &Path) {
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
    assert!(status.success());
}

/// A world with one registered project `demo` (prefix `dm`) whose repo is
/// a real git repository.
fn world() -> World {
    let dir = TempDir::new().unwrap();
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    std::fs::create_dir_all(repo.path().join(".beads")).unwrap();
    std::fs::write(repo.path().join(".beads/config.json"), r#"{"prefix":"dm"}"#).unwrap();

    let paths = ConfigStore::at(dir.path().join("config"));
    let config = Config {
        worktree_root: dir.path().join("worktrees"),
        editor_cmd: "claude".into(),
        default_merge_mode: MergeMode::Direct,
    };
    let wt = Orchestrator::new(
        paths,
        config,
        FakeMultiplexer::new(),
        FakeIssueStore::new(),
        FakeMergeDriver::new(),
        FakeNotifyAdapter::new(),
        FakeClock::new(),
    );
    wt.registry
        .add(
            "demo",
            &RepoIdentity { root: repo.path().to_path_buf(), origin_url: String::new() },
            AddOptions::default(),
        )
        .unwrap();

    World { dir, _repo: repo, wt }
}

/// Scenario: single bead, direct merge, full lifecycle.
#[tokio::test]
async fn bead_session_direct_merge_lifecycle() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let world = world();
    let wt = &world.wt;
    wt.issues.put_simple("dm-abc", "Widget fix", "straighten it");

    // new --no-switch
    let session = wt.new_bead_session("dm-abc", NewOptions::default()).await.unwrap();
    let theme = theme_for_project("demo");
    assert_eq!(session.name, format!("demo-{}", theme.names[0]));
    assert!(world.dir.path().join("worktrees").join(&session.name).is_dir());
    assert!(wt.mux.session_exists(&session.name).await);
    assert_eq!(wt.sessions.load().unwrap().len(), 1);

    // The worker signals readiness, then completes.
    wt.signal(&session.name, "ready", None).unwrap();
    let report = wt.done(&session.name, DoneOptions::default()).await.unwrap();
    assert_eq!(report.merge_mode, MergeMode::Direct);

    // Invariant: session ↔ worktree. Store empty, directory gone.
    assert!(wt.sessions.load().unwrap().is_empty());
    assert!(!world.dir.path().join("worktrees").join(&session.name).exists());
    assert_eq!(wt.issues.status_of("dm-abc").as_deref(), Some("closed"));

    // Event log round-trip: find_session returns the session_end.
    let end = wt.events.find_session(&session.name).unwrap().unwrap();
    assert_eq!(end.merge_mode, Some(MergeMode::Direct));
    assert_eq!(end.pr_url.as_deref(), Some(""));
}

/// Scenario: PR review flow captures the URL end to end.
#[tokio::test]
async fn bead_session_pr_review_flow() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let world = world();
    let wt = &world.wt;
    wt.issues.put_simple("dm-def", "Add flange", "attach it");
    let mut project = wt.registry.get("demo").unwrap();
    project.merge_mode = MergeMode::PrReview;
    wt.registry.save(&project).unwrap();
    wt.merge.set_pr_url("https://example.com/pr/12");

    let session = wt.new_bead_session("dm-def", NewOptions::default()).await.unwrap();
    let report = wt.done(&session.name, DoneOptions::default()).await.unwrap();

    assert_eq!(report.pr_url.as_deref(), Some("https://example.com/pr/12"));
    let end = wt.events.find_session(&session.name).unwrap().unwrap();
    assert_eq!(end.pr_url.as_deref(), Some("https://example.com/pr/12"));
    assert_eq!(wt.issues.status_of("dm-def").as_deref(), Some("closed"));
}

/// Invariants: bead uniqueness and port disjointness across live sessions.
#[tokio::test]
async fn store_invariants_hold_across_operations() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let world = world();
    let wt = &world.wt;
    let mut project = wt.registry.get("demo").unwrap();
    project.test_env = Some(wt_core::TestEnv::default());
    wt.registry.save(&project).unwrap();

    for id in ["dm-1", "dm-2", "dm-3"] {
        wt.issues.put_simple(id, "t", "d");
        wt.new_bead_session(id, NewOptions::default()).await.unwrap();
    }

    let sessions = wt.sessions.load().unwrap();
    // Bead uniqueness.
    let mut beads: Vec<_> = sessions.values().filter_map(|s| s.bead()).collect();
    beads.sort_unstable();
    beads.dedup();
    assert_eq!(beads.len(), 3);

    // Port disjointness.
    let mut offsets: Vec<_> =
        sessions.values().map(|s| s.port_offset).filter(|o| *o > 0).collect();
    offsets.sort_unstable();
    let deduped = offsets.len();
    offsets.dedup();
    assert_eq!(offsets.len(), deduped);

    // Name pool purity: every theme_name comes from the project's theme.
    let theme = theme_for_project("demo");
    for session in sessions.values() {
        let name = session.theme_name.as_deref().unwrap();
        assert!(theme.names.contains(&name));
    }

    // Worktrees exist for every live session.
    for session in sessions.values() {
        assert!(session.worktree.is_dir());
    }
}

/// Scenario: kill preserves the bead and is idempotent.
#[tokio::test]
async fn kill_preserves_bead_and_is_idempotent() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let world = world();
    let wt = &world.wt;
    wt.issues.put_simple("dm-ghi", "t", "d");

    let session = wt.new_bead_session("dm-ghi", NewOptions::default()).await.unwrap();
    wt.kill(&session.name, false).await.unwrap();

    assert!(!wt.mux.session_exists(&session.name).await);
    assert!(!session.worktree.exists());
    assert!(wt.sessions.load().unwrap().is_empty());
    assert_eq!(wt.issues.status_of("dm-ghi").as_deref(), Some("open"));

    let events_before = wt.events.read_all().unwrap().len();
    wt.kill(&session.name, false).await.unwrap();
    assert_eq!(wt.events.read_all().unwrap().len(), events_before);
}

/// Scenario: auto epic with two dependent beads, one merge, clean end.
#[tokio::test]
async fn auto_epic_end_to_end() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let world = world();
    let wt = &world.wt;
    wt.issues.put(wt_adapters::Bead {
        id: "dm-epic".into(),
        title: "epic".into(),
        description: "batch".into(),
        status: "open".into(),
        issue_type: "epic".into(),
        priority: None,
        dependencies: vec!["dm-1".into(), "dm-2".into()],
    });
    wt.issues.put_simple("dm-1", "first", "one");
    wt.issues.put(wt_adapters::Bead {
        id: "dm-2".into(),
        title: "second".into(),
        description: "two".into(),
        status: "open".into(),
        issue_type: "task".into(),
        priority: None,
        dependencies: vec!["dm-1".into()],
    });

    // Worker stand-in.
    let store = wt.sessions.clone();
    let signaler = tokio::spawn(async move {
        for _ in 0..500 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = store.with_lock(|sessions| {
                if let Some(s) = sessions.get_mut("epic-dm-epic") {
                    if s.status == SessionStatus::Working {
                        s.status = SessionStatus::Ready;
                    }
                }
                Ok(())
            });
        }
    });

    let mut opts = AutoOptions::new("dm-epic");
    opts.timeout = Duration::from_secs(5);
    opts.poll = Duration::from_millis(20);
    let outcome = wt.auto(opts).await.unwrap();
    signaler.abort();

    assert_eq!(outcome, AutoOutcome::Completed { pr_url: None });
    assert!(!wt.paths.auto_sentinel_path().exists());
    assert!(wt.sessions.load().unwrap().is_empty());

    let end = wt.events.find_session("epic-dm-epic").unwrap().unwrap();
    assert_eq!(end.bead, "dm-epic");
    assert_eq!(end.merge_mode, Some(MergeMode::Direct));
}
