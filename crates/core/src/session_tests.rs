// SPDX-License-Identifier: MIT

use super::*;
use chrono::TimeZone;
use yare::parameterized;

fn bead_session() -> Session {
    let t = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap();
    Session {
        name: "demo-amazon".into(),
        project: "demo".into(),
        worktree: "/tmp/worktrees/demo-amazon".into(),
        branch: "dm-42".into(),
        port_offset: 0,
        beads_dir: "/tmp/repo/.beads".into(),
        created_at: t,
        last_activity: t,
        status: SessionStatus::Working,
        status_message: None,
        theme_name: Some("amazon".into()),
        kind: SessionKind::Bead { bead: "dm-42".into() },
    }
}

#[parameterized(
    working = { "working", SessionStatus::Working },
    idle = { "idle", SessionStatus::Idle },
    ready = { "ready", SessionStatus::Ready },
    blocked = { "blocked", SessionStatus::Blocked },
    error = { "error", SessionStatus::Error },
)]
fn status_round_trips_through_str(s: &str, expected: SessionStatus) {
    assert_eq!(s.parse::<SessionStatus>().unwrap(), expected);
    assert_eq!(expected.to_string(), s);
}

#[test]
fn unknown_status_is_rejected() {
    assert!("done".parse::<SessionStatus>().is_err());
    assert!("".parse::<SessionStatus>().is_err());
}

#[test]
fn bead_accessor_distinguishes_kinds() {
    let bead = bead_session();
    assert_eq!(bead.bead(), Some("dm-42"));
    assert!(!bead.is_task());
    assert_eq!(bead.completion_condition(), None);

    let mut task = bead_session();
    task.kind = SessionKind::Task {
        description: "spike".into(),
        condition: CompletionCondition::Pushed,
    };
    assert_eq!(task.bead(), None);
    assert!(task.is_task());
    assert_eq!(task.completion_condition(), Some(CompletionCondition::Pushed));
}

#[test]
fn session_serializes_flat_with_kind_tag() {
    let session = bead_session();
    let json = serde_json::to_value(&session).unwrap();

    // Header fields and variant fields live side by side.
    assert_eq!(json["kind"], "bead");
    assert_eq!(json["bead"], "dm-42");
    assert_eq!(json["name"], "demo-amazon");
    assert_eq!(json["status"], "working");

    let back: Session = serde_json::from_value(json).unwrap();
    assert_eq!(back, session);
}

#[test]
fn task_condition_defaults_to_none() {
    let json = serde_json::json!({
        "name": "demo-nile",
        "project": "demo",
        "worktree": "/tmp/wt",
        "branch": "task/spike",
        "beads_dir": "/tmp/repo/.beads",
        "created_at": "2026-03-01T12:00:00Z",
        "last_activity": "2026-03-01T12:00:00Z",
        "status": "idle",
        "kind": "task",
        "description": "spike"
    });
    let session: Session = serde_json::from_value(json).unwrap();
    assert_eq!(session.completion_condition(), Some(CompletionCondition::None));
    assert_eq!(session.port_offset, 0);
}

#[parameterized(
    none = { "none", CompletionCondition::None },
    pr_merged = { "pr-merged", CompletionCondition::PrMerged },
    pushed = { "pushed", CompletionCondition::Pushed },
    tests_pass = { "tests-pass", CompletionCondition::TestsPass },
    user_confirm = { "user-confirm", CompletionCondition::UserConfirm },
)]
fn completion_condition_parses(s: &str, expected: CompletionCondition) {
    assert_eq!(s.parse::<CompletionCondition>().unwrap(), expected);
}
