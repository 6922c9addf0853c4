// SPDX-License-Identifier: MIT

use super::*;
use crate::test_fixture::*;
use wt_adapters::PrState;
use wt_core::test_support::SessionBuilder;

/// Fix the clock at a known epoch and return it in seconds.
fn pin_clock(fix: &Fix) -> u64 {
    let epoch_ms: u64 = 1_800_000_000_000;
    fix.orc.clock.set_epoch_ms(epoch_ms);
    epoch_ms / 1000
}

#[tokio::test]
async fn explicit_signals_stick() {
    let fix = fixture();
    let now = pin_clock(&fix);
    let session =
        insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").status(SessionStatus::Ready).build());
    // Activity says "busy right now", but the signal wins.
    fix.orc.mux.set_activity(&session.name, now);

    assert_eq!(fix.orc.derived_status(&session).await, SessionStatus::Ready);
}

#[tokio::test]
async fn activity_decides_working_versus_idle() {
    let fix = fixture();
    let now = pin_clock(&fix);
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());

    fix.orc.mux.set_activity(&session.name, now - 60);
    assert_eq!(fix.orc.derived_status(&session).await, SessionStatus::Working);

    // Past the 5-minute threshold.
    fix.orc.mux.set_activity(&session.name, now - 6 * 60);
    assert_eq!(fix.orc.derived_status(&session).await, SessionStatus::Idle);
}

#[tokio::test]
async fn missing_activity_keeps_the_stored_status() {
    let fix = fixture();
    pin_clock(&fix);
    let session = insert_session(
        &fix,
        SessionBuilder::bead("demo-amazon", "dm-1").status(SessionStatus::Idle).build(),
    );
    assert_eq!(fix.orc.derived_status(&session).await, SessionStatus::Idle);
}

#[tokio::test]
async fn watch_tick_reports_transitions_once() {
    let fix = fixture();
    let now = pin_clock(&fix);
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());
    fix.orc.mux.set_activity(&session.name, now);

    let mut state = WatchState::default();
    // Baseline tick: nothing to report.
    assert!(fix.orc.watch_tick(&mut state).await.unwrap().is_empty());

    // Worker signals ready.
    fix.orc.signal(&session.name, "ready", None).unwrap();
    let changes = fix.orc.watch_tick(&mut state).await.unwrap();
    assert_eq!(
        changes,
        vec![StatusChange::Became { session: session.name.clone(), status: SessionStatus::Ready }]
    );

    // No repeat while the status is unchanged.
    assert!(fix.orc.watch_tick(&mut state).await.unwrap().is_empty());
}

#[tokio::test]
async fn watch_tick_reports_session_end() {
    let fix = fixture();
    let now = pin_clock(&fix);
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());
    fix.orc.mux.set_activity(&session.name, now);

    let mut state = WatchState::default();
    fix.orc.watch_tick(&mut state).await.unwrap();

    fix.orc.kill(&session.name, false).await.unwrap();
    let changes = fix.orc.watch_tick(&mut state).await.unwrap();
    assert_eq!(changes, vec![StatusChange::Ended { session: session.name.clone() }]);
}

#[tokio::test]
async fn watch_tick_reports_pr_merge_once() {
    let fix = fixture();
    let now = pin_clock(&fix);
    let mut session = SessionBuilder::bead("demo-amazon", "dm-1").build();
    session.status_message = Some("PR: https://example.com/pr/3".into());
    let session = insert_session(&fix, session);
    fix.orc.mux.set_activity(&session.name, now);
    fix.orc.merge.set_pr_state(PrState::Merged);

    let mut state = WatchState::default();
    let changes = fix.orc.watch_tick(&mut state).await.unwrap();
    assert!(changes.contains(&StatusChange::PrMerged {
        session: session.name.clone(),
        url: "https://example.com/pr/3".into()
    }));

    // Merged is reported a single time.
    assert!(fix.orc.watch_tick(&mut state).await.unwrap().is_empty());
}

#[test]
fn changes_render_into_title_and_body() {
    let (title, body) = StatusChange::Became {
        session: "demo-amazon".into(),
        status: SessionStatus::Blocked,
    }
    .render();
    assert_eq!(title, "wt: demo-amazon");
    assert_eq!(body, "session is blocked");

    let (_, body) =
        StatusChange::PrMerged { session: "s".into(), url: "https://x".into() }.render();
    assert!(body.contains("https://x"));
}
