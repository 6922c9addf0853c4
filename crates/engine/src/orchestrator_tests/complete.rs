// SPDX-License-Identifier: MIT

use crate::orchestrator::DoneOptions;
use crate::test_fixture::*;
use wt_adapters::merge::MergeCall;
use wt_adapters::{Multiplexer, PrState};
use wt_core::test_support::SessionBuilder;
use wt_core::{AutoRebase, CompletionCondition, Error, EventKind, MergeMode};

#[tokio::test]
async fn done_direct_merges_closes_and_cleans_up() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-1", "Fix the widget", "d");
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());

    let report = fix.orc.done(&session.name, DoneOptions::default()).await.unwrap();
    assert_eq!(report.merge_mode, MergeMode::Direct);
    assert_eq!(report.pr_url, None);

    // Merge ran against the session branch and project default branch.
    let calls = fix.orc.merge.calls();
    assert_eq!(
        calls,
        vec![MergeCall::DirectMerge { branch: "dm-1".into(), default_branch: "main".into() }]
    );

    // Bead closed, resources gone, store empty.
    assert_eq!(fix.orc.issues.status_of("dm-1").as_deref(), Some("closed"));
    assert!(!session.worktree.exists());
    assert!(!fix.orc.mux.session_exists(&session.name).await);
    assert!(fix.orc.sessions.load().unwrap().is_empty());

    // session_end records the merge mode and an empty PR URL.
    let events = fix.orc.events.read_all().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::SessionEnd);
    assert_eq!(events[0].merge_mode, Some(MergeMode::Direct));
    assert_eq!(events[0].pr_url.as_deref(), Some(""));
}

#[tokio::test]
async fn dirty_worktree_blocks_done() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-1", "Fix", "d");
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());
    fix.orc.merge.set_dirty(true);

    let err = fix.orc.done(&session.name, DoneOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::UncommittedChanges));

    // Session live, bead open, worktree intact.
    assert_eq!(fix.orc.sessions.load().unwrap().len(), 1);
    assert_eq!(fix.orc.issues.status_of("dm-1").as_deref(), Some("open"));
    assert!(session.worktree.exists());
}

#[tokio::test]
async fn done_pr_review_captures_the_url() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-2", "Add the flange", "d");
    update_project(&fix, |p| p.merge_mode = MergeMode::PrReview);
    fix.orc.merge.set_pr_url("https://example.com/pr/7");
    let session = insert_session(&fix, SessionBuilder::bead("demo-nile", "dm-2").build());

    let report = fix.orc.done(&session.name, DoneOptions::default()).await.unwrap();
    assert_eq!(report.pr_url.as_deref(), Some("https://example.com/pr/7"));

    // PR created with the bead title; auto-merge NOT enabled for review.
    let calls = fix.orc.merge.calls();
    assert!(matches!(
        &calls[0],
        MergeCall::CreatePr { branch, title, .. }
            if branch == "dm-2" && title == "Add the flange"
    ));
    assert!(!calls.iter().any(|c| matches!(c, MergeCall::EnableAutoMerge { .. })));

    let events = fix.orc.events.read_all().unwrap();
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::PrCreated, EventKind::SessionEnd]);
    assert_eq!(events[1].pr_url.as_deref(), Some("https://example.com/pr/7"));
}

#[tokio::test]
async fn done_pr_auto_enables_auto_merge() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-2", "Add", "d");
    update_project(&fix, |p| p.merge_mode = MergeMode::PrAuto);
    let session = insert_session(&fix, SessionBuilder::bead("demo-nile", "dm-2").build());

    fix.orc.done(&session.name, DoneOptions::default()).await.unwrap();
    let calls = fix.orc.merge.calls();
    assert!(calls.iter().any(|c| matches!(c, MergeCall::EnableAutoMerge { .. })));
}

#[tokio::test]
async fn merge_mode_flag_overrides_the_project() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-1", "Fix", "d");
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());

    let opts = DoneOptions { merge_mode: Some(MergeMode::PrReview), ..DoneOptions::default() };
    let report = fix.orc.done(&session.name, opts).await.unwrap();
    assert_eq!(report.merge_mode, MergeMode::PrReview);
    assert!(report.pr_url.is_some());
}

#[tokio::test]
async fn conflict_without_rebase_policy_is_fatal_and_preserves_state() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-1", "Fix", "d");
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());
    fix.orc.merge.conflict_once();

    let err = fix.orc.done(&session.name, DoneOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::MergeConflict(_)));

    // Nothing was cleaned up, no rebase was attempted.
    assert_eq!(fix.orc.sessions.load().unwrap().len(), 1);
    assert_eq!(fix.orc.issues.status_of("dm-1").as_deref(), Some("open"));
    assert!(!fix.orc.merge.calls().iter().any(|c| matches!(c, MergeCall::Rebase { .. })));
}

#[tokio::test]
async fn conflict_with_auto_rebase_recovers() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-1", "Fix", "d");
    update_project(&fix, |p| p.auto_rebase = AutoRebase::On);
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());
    fix.orc.merge.conflict_once();

    fix.orc.done(&session.name, DoneOptions::default()).await.unwrap();

    let calls = fix.orc.merge.calls();
    assert!(matches!(calls[0], MergeCall::DirectMerge { .. }));
    assert!(matches!(calls[1], MergeCall::Rebase { .. }));
    assert!(matches!(calls[2], MergeCall::DirectMerge { .. }));
    assert!(fix.orc.sessions.load().unwrap().is_empty());
}

#[tokio::test]
async fn prompt_policy_honors_explicit_consent() {
    let fix = fixture();
    fix.orc.issues.put_simple("dm-1", "Fix", "d");
    update_project(&fix, |p| p.auto_rebase = AutoRebase::Prompt);
    let session = insert_session(&fix, SessionBuilder::bead("demo-amazon", "dm-1").build());
    fix.orc.merge.conflict_once();

    // Without consent, prompt degrades to abort with a hint.
    let err = fix.orc.done(&session.name, DoneOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::MergeConflict(msg) if msg.contains("confirm")));

    // With consent, the rebase runs.
    fix.orc.merge.conflict_once();
    let opts = DoneOptions { rebase_consent: Some(true), ..DoneOptions::default() };
    fix.orc.done(&session.name, opts).await.unwrap();
    assert!(fix.orc.merge.calls().iter().any(|c| matches!(c, MergeCall::Rebase { .. })));
}

#[tokio::test]
async fn task_pushed_condition_gates_done() {
    let fix = fixture();
    let session = insert_session(
        &fix,
        SessionBuilder::task("demo-nile", "spike")
            .condition(CompletionCondition::Pushed)
            .build(),
    );

    fix.orc.merge.set_pushed(false);
    let err = fix.orc.done(&session.name, DoneOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::ConditionUnmet(_)));

    fix.orc.merge.set_pushed(true);
    fix.orc.done(&session.name, DoneOptions::default()).await.unwrap();
}

#[tokio::test]
async fn task_user_confirm_condition_needs_assent() {
    let fix = fixture();
    let session = insert_session(
        &fix,
        SessionBuilder::task("demo-nile", "spike")
            .condition(CompletionCondition::UserConfirm)
            .build(),
    );

    let err = fix.orc.done(&session.name, DoneOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::ConditionUnmet(_)));

    let opts = DoneOptions { user_confirmed: true, ..DoneOptions::default() };
    fix.orc.done(&session.name, opts).await.unwrap();
}

#[tokio::test]
async fn task_pr_merged_condition_reads_the_status_message() {
    let fix = fixture();
    let mut session = SessionBuilder::task("demo-nile", "spike")
        .condition(CompletionCondition::PrMerged)
        .build();

    // No URL recorded yet.
    let stored = insert_session(&fix, session.clone());
    let err = fix.orc.done(&stored.name, DoneOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::ConditionUnmet(_)));

    // URL present but PR still open.
    session.status_message = Some("PR at https://example.com/pr/9".into());
    let stored = insert_session(&fix, session.clone());
    fix.orc.merge.set_pr_state(PrState::Open);
    let err = fix.orc.done(&stored.name, DoneOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::ConditionUnmet(_)));

    // Merged: done proceeds.
    fix.orc.merge.set_pr_state(PrState::Merged);
    fix.orc.done(&stored.name, DoneOptions::default()).await.unwrap();
}

#[tokio::test]
async fn done_on_unknown_session_is_not_in_session() {
    let fix = fixture();
    let err = fix.orc.done("ghost", DoneOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::NotInSession));
}
