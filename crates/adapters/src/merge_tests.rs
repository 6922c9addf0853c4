// SPDX-License-Identifier: MIT

use super::*;
use yare::parameterized;

#[parameterized(
    conflict_marker = { "CONFLICT (content): Merge conflict in a.rs" },
    auto_merge = { "Automatic merge failed; fix conflicts and then commit the result." },
    non_ff = { "! [rejected] main -> main (non-fast-forward)" },
    fetch_first = { "! [rejected] dm-1 -> dm-1 (fetch first)" },
    no_ff_possible = { "fatal: Not possible to fast-forward, aborting." },
)]
fn conflicting_stderr_classifies_as_conflict(stderr: &str) {
    assert!(matches!(classify_merge_failure(stderr), MergeError::Conflict(_)));
}

#[test]
fn other_stderr_classifies_as_failed() {
    assert!(matches!(
        classify_merge_failure("fatal: repository not found"),
        MergeError::Failed(_)
    ));
}

#[test]
fn errors_map_to_core_kinds() {
    let err: wt_core::Error = MergeError::Conflict("x".into()).into();
    assert!(matches!(err, wt_core::Error::MergeConflict(_)));
    let err: wt_core::Error = MergeError::PrCreateFailed("x".into()).into();
    assert!(matches!(err, wt_core::Error::PRCreateFailed(_)));
}

#[tokio::test]
async fn fake_scripts_a_conflict_once() {
    let driver = FakeMergeDriver::new();
    driver.conflict_once();
    let worktree = Path::new("/tmp/wt");

    assert!(matches!(
        driver.direct_merge(worktree, "dm-1", "main").await,
        Err(MergeError::Conflict(_))
    ));
    driver.rebase_onto_default(worktree, "main").await.unwrap();
    driver.direct_merge(worktree, "dm-1", "main").await.unwrap();

    let calls = driver.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(&calls[1], MergeCall::Rebase { default_branch } if default_branch == "main"));
}

#[tokio::test]
async fn fake_reports_scripted_pr_details() {
    let driver = FakeMergeDriver::new();
    driver.set_pr_url("https://example.com/pr/42");
    driver.set_pr_state(PrState::Merged);
    let worktree = Path::new("/tmp/wt");

    let url = driver.create_pr(worktree, "dm-1", "main", "Fix the thing").await.unwrap();
    assert_eq!(url, "https://example.com/pr/42");
    driver.enable_auto_merge(worktree, &url).await.unwrap();
    assert_eq!(driver.pr_state(worktree, "dm-1").await.unwrap(), PrState::Merged);
}

#[tokio::test]
async fn fake_tracks_dirty_and_pushed_state() {
    let driver = FakeMergeDriver::new();
    let worktree = Path::new("/tmp/wt");

    assert!(!driver.has_uncommitted_changes(worktree).await.unwrap());
    driver.set_dirty(true);
    assert!(driver.has_uncommitted_changes(worktree).await.unwrap());

    assert!(driver.is_pushed(worktree).await.unwrap());
    driver.set_pushed(false);
    assert!(!driver.is_pushed(worktree).await.unwrap());
}
