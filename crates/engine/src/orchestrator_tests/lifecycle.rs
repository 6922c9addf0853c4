// SPDX-License-Identifier: MIT

use crate::test_fixture::*;
use wt_adapters::Multiplexer;
use wt_core::test_support::SessionBuilder;
use wt_core::{Error, EventKind, SessionStatus};
use yare::parameterized;

#[parameterized(
    working = { "working" },
    ready = { "ready" },
    blocked = { "blocked" },
    error = { "error" },
    idle = { "idle" },
)]
fn signal_accepts_the_full_vocabulary(status: &str) {
    let fix = fixture();
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());

    fix.orc.signal(&session.name, status, None).unwrap();
    let stored = fix.orc.sessions.load().unwrap();
    assert_eq!(stored[&session.name].status.to_string(), status);
}

#[tokio::test]
async fn signal_rejects_unknown_status_without_touching_state() {
    let fix = fixture();
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());
    let before = fix.orc.sessions.load().unwrap();

    let err = fix.orc.signal(&session.name, "done", None).unwrap_err();
    assert!(matches!(err, Error::InvalidStatus(_)));
    assert_eq!(fix.orc.sessions.load().unwrap(), before);
}

#[tokio::test]
async fn signal_records_message_and_bumps_activity() {
    let fix = fixture();
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());

    fix.orc.clock.set_epoch_ms(1_800_000_000_000);
    fix.orc.signal(&session.name, "blocked", Some("waiting on review".into())).unwrap();

    let stored = fix.orc.sessions.load().unwrap();
    let updated = &stored[&session.name];
    assert_eq!(updated.status, SessionStatus::Blocked);
    assert_eq!(updated.status_message.as_deref(), Some("waiting on review"));
    assert_eq!(updated.last_activity.timestamp_millis(), 1_800_000_000_000);
}

#[tokio::test]
async fn signal_on_unknown_session_errors() {
    let fix = fixture();
    assert!(fix.orc.signal("ghost", "ready", None).is_err());
}

#[tokio::test]
async fn kill_removes_resources_but_leaves_the_bead() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-1", "Fix", "d");
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());

    fix.orc.kill(&session.name, false).await.unwrap();

    assert!(!fix.orc.mux.session_exists(&session.name).await);
    assert!(!session.worktree.exists());
    assert!(fix.orc.sessions.load().unwrap().is_empty());
    // The bead status is deliberately unchanged.
    assert_eq!(fix.orc.issues.status_of("dm-1").as_deref(), Some("open"));

    let events = fix.orc.events.read_all().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::SessionKill);
}

#[tokio::test]
async fn kill_is_idempotent() {
    let fix = fixture();
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());

    fix.orc.kill(&session.name, false).await.unwrap();
    let events_after_first = fix.orc.events.read_all().unwrap().len();

    // Second kill: success, no further state changes.
    fix.orc.kill(&session.name, false).await.unwrap();
    assert_eq!(fix.orc.events.read_all().unwrap().len(), events_after_first);
}

#[tokio::test]
async fn kill_can_keep_the_worktree() {
    let fix = fixture();
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());

    fix.orc.kill(&session.name, true).await.unwrap();
    assert!(session.worktree.exists());
    assert!(fix.orc.sessions.load().unwrap().is_empty());
}

#[tokio::test]
async fn abandon_discards_without_merging() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-1", "Fix", "d");
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());

    fix.orc.abandon(&session.name).await.unwrap();

    assert!(fix.orc.merge.calls().is_empty());
    assert_eq!(fix.orc.issues.status_of("dm-1").as_deref(), Some("open"));
    assert!(!session.worktree.exists());
    assert!(fix.orc.sessions.load().unwrap().is_empty());
}

#[tokio::test]
async fn abandon_requires_a_live_session() {
    let fix = fixture();
    let err = fix.orc.abandon("ghost").await.unwrap_err();
    assert!(matches!(err, Error::NotInSession));
}

#[tokio::test]
async fn on_close_hooks_run_during_cleanup() {
    let fix = fixture();
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());
    let marker = session.worktree.join("closed.txt");
    update_project(&fix, |p| {
        p.on_close = vec![format!("touch {}", marker.display())];
    });

    fix.orc.kill(&session.name, true).await.unwrap();
    assert!(marker.is_file());
}

#[tokio::test]
async fn session_for_cwd_resolves_inside_the_worktree() {
    let fix = fixture();
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());
    let sub = session.worktree.join("src");
    std::fs::create_dir_all(&sub).unwrap();

    assert_eq!(fix.orc.session_for_cwd(&sub).unwrap().name, session.name);
    assert!(matches!(
        fix.orc.session_for_cwd(fix.dir.path()),
        Err(Error::NotInSession)
    ));
}

#[tokio::test]
async fn used_port_offsets_skips_zero() {
    let fix = fixture();
    insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").port_offset(1000).build());
    insert_session(&fix, SessionBuilder::bead("demo-nile", "dm-2").build());

    let used = fix.orc.used_port_offsets().unwrap();
    assert!(used.contains(&1000));
    assert_eq!(used.len(), 1);
}
