// SPDX-License-Identifier: MIT

use crate::orchestrator::{NewOptions, SwitchMode};
use crate::test_fixture::*;
use wt_adapters::multiplexer::MuxCall;
use wt_adapters::Multiplexer;
use wt_core::{theme_for_project, CompletionCondition, Error, EventKind, SessionStatus, TestEnv};

#[tokio::test]
async fn new_bead_session_provisions_everything() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let fix = fixture();
    init_repo(fix.repo.path());
    fix.orc.issues.put_simple("dm-1", "Fix the widget", "It wobbles.");

    let session = fix.orc.new_bead_session("dm-1", NewOptions::default()).await.unwrap();

    let theme = theme_for_project("demo");
    assert_eq!(session.name, format!("demo-{}", theme.names[0]));
    assert_eq!(session.branch, "dm-1");
    assert_eq!(session.status, SessionStatus::Working);
    assert_eq!(session.theme_name.as_deref(), Some(theme.names[0]));
    assert!(session.worktree.is_dir());
    assert!(session.worktree.join("seed.txt").is_file());

    // Store, multiplexer and event log all know about it.
    let stored = fix.orc.sessions.load().unwrap();
    assert_eq!(stored.len(), 1);
    assert!(fix.orc.mux.session_exists(&session.name).await);

    let events = fix.orc.events.read_all().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::SessionStart);
    assert_eq!(events[0].bead, "dm-1");

    // The initial prompt mentions the bead and how to finish.
    let nudges = fix.orc.mux.nudges(&session.name);
    assert_eq!(nudges.len(), 1);
    assert!(nudges[0].contains("dm-1"));
    assert!(nudges[0].contains("wt done"));
}

#[tokio::test]
async fn second_session_for_same_bead_is_rejected() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let fix = fixture();
    init_repo(fix.repo.path());
    fix.orc.issues.put_simple("dm-1", "Fix", "d");

    fix.orc.new_bead_session("dm-1", NewOptions::default()).await.unwrap();
    let err = fix.orc.new_bead_session("dm-1", NewOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::BeadInUse { bead, .. } if bead == "dm-1"));
}

#[tokio::test]
async fn unknown_bead_is_rejected_before_any_resources() {
    let fix = fixture();
    let err = fix.orc.new_bead_session("dm-404", NewOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::BeadNotFound(_)));
    assert!(fix.orc.sessions.load().unwrap().is_empty());
}

#[tokio::test]
async fn failed_multiplexer_rolls_back_the_worktree() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let fix = fixture();
    init_repo(fix.repo.path());
    fix.orc.issues.put_simple("dm-1", "Fix", "d");
    fix.orc.mux.fail_new_session();

    let err = fix.orc.new_bead_session("dm-1", NewOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::MultiplexerUnavailable(_)));

    // No worktree directory, no store entry, no events.
    let theme = theme_for_project("demo");
    let worktree = fix.dir.path().join("worktrees").join(format!("demo-{}", theme.names[0]));
    assert!(!worktree.exists());
    assert!(fix.orc.sessions.load().unwrap().is_empty());
    assert!(fix.orc.events.read_all().unwrap().is_empty());
}

#[tokio::test]
async fn editor_never_ready_rolls_back_everything_but_the_log() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let fix = fixture();
    init_repo(fix.repo.path());
    fix.orc.issues.put_simple("dm-1", "Fix", "d");
    fix.orc.mux.set_editor_ready(false);

    let err = fix.orc.new_bead_session("dm-1", NewOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::EditorNotReady(_)));

    // Worktree and store entry rolled back; the session_start event stays
    // (the log is append-only history).
    let theme = theme_for_project("demo");
    let worktree = fix.dir.path().join("worktrees").join(format!("demo-{}", theme.names[0]));
    assert!(!worktree.exists());
    assert!(fix.orc.sessions.load().unwrap().is_empty());
    assert_eq!(fix.orc.events.read_all().unwrap().len(), 1);

    // The freed theme name is reusable immediately.
    fix.orc.mux.set_editor_ready(true);
    let session = fix.orc.new_bead_session("dm-1", NewOptions::default()).await.unwrap();
    assert_eq!(session.name, format!("demo-{}", theme.names[0]));
}

#[tokio::test]
async fn names_walk_the_theme_and_reuse_freed_slots() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let fix = fixture();
    init_repo(fix.repo.path());
    for id in ["dm-1", "dm-2", "dm-3", "dm-4"] {
        fix.orc.issues.put_simple(id, "t", "d");
    }
    let theme = theme_for_project("demo");

    let first = fix.orc.new_bead_session("dm-1", NewOptions::default()).await.unwrap();
    let second = fix.orc.new_bead_session("dm-2", NewOptions::default()).await.unwrap();
    let third = fix.orc.new_bead_session("dm-3", NewOptions::default()).await.unwrap();
    assert_eq!(first.name, format!("demo-{}", theme.names[0]));
    assert_eq!(second.name, format!("demo-{}", theme.names[1]));
    assert_eq!(third.name, format!("demo-{}", theme.names[2]));

    // Freeing the middle slot makes it the next allocation.
    fix.orc.kill(&second.name, false).await.unwrap();
    let fourth = fix.orc.new_bead_session("dm-4", NewOptions::default()).await.unwrap();
    assert_eq!(fourth.name, format!("demo-{}", theme.names[1]));
}

#[tokio::test]
async fn task_sessions_branch_from_their_name() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let fix = fixture();
    init_repo(fix.repo.path());

    let session = fix
        .orc
        .new_task_session(
            "spike the cache layer",
            CompletionCondition::Pushed,
            Some("demo"),
            NewOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(session.branch, format!("task/{}", session.name));
    assert_eq!(session.bead(), None);
    assert_eq!(session.completion_condition(), Some(CompletionCondition::Pushed));
    // Task prompts explain the completion condition.
    let nudges = fix.orc.mux.nudges(&session.name);
    assert!(nudges[0].contains("spike the cache layer"));
    assert!(nudges[0].contains("pushed"));
}

#[tokio::test]
async fn port_offsets_are_allocated_per_live_session() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let fix = fixture();
    init_repo(fix.repo.path());
    update_project(&fix, |p| p.test_env = Some(TestEnv::default()));
    fix.orc.issues.put_simple("dm-1", "t", "d");
    fix.orc.issues.put_simple("dm-2", "t", "d");

    let first = fix.orc.new_bead_session("dm-1", NewOptions::default()).await.unwrap();
    let second = fix.orc.new_bead_session("dm-2", NewOptions::default()).await.unwrap();
    assert_eq!(first.port_offset, 1000);
    assert_eq!(second.port_offset, 1100);

    // The offset reaches the multiplexer environment.
    let calls = fix.orc.mux.calls();
    assert!(calls.iter().any(|c| matches!(
        c,
        MuxCall::NewSession { port_offset: 1000, .. }
    )));
}

#[tokio::test]
async fn no_test_env_flag_skips_the_sandbox() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let fix = fixture();
    init_repo(fix.repo.path());
    update_project(&fix, |p| p.test_env = Some(TestEnv::default()));
    fix.orc.issues.put_simple("dm-1", "t", "d");

    let opts = NewOptions { no_test_env: true, ..NewOptions::default() };
    let session = fix.orc.new_bead_session("dm-1", opts).await.unwrap();
    assert_eq!(session.port_offset, 0);
}

#[tokio::test]
async fn switch_mode_drives_the_terminal() {
    if !git_available() {
        eprintln!("skipping test: git not available");
        return;
    }
    let fix = fixture();
    init_repo(fix.repo.path());
    fix.orc.issues.put_simple("dm-1", "t", "d");

    let opts = NewOptions { switch: SwitchMode::Switch, ..NewOptions::default() };
    let session = fix.orc.new_bead_session("dm-1", opts).await.unwrap();

    let calls = fix.orc.mux.calls();
    assert!(calls
        .iter()
        .any(|c| matches!(c, MuxCall::SwitchClient(name) if *name == session.name)));
}
