// SPDX-License-Identifier: MIT

use super::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Random prefix for this test run to avoid conflicts with parallel runs.
static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("wt{:04x}", nanos & 0xFFFF)
});

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_name(suffix: &str) -> String {
    let id = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", *TEST_PREFIX, suffix, id)
}

/// Check if tmux is available on this system
fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn kill_test_session(name: &str) {
    let _ = std::process::Command::new("tmux").args(["kill-session", "-t", name]).status();
}

#[tokio::test]
async fn tmux_session_lifecycle() {
    if !tmux_available() {
        eprintln!("skipping test: tmux not available");
        return;
    }
    let mux = TmuxMultiplexer::new();
    let name = unique_name("lifecycle");
    let dir = tempfile::TempDir::new().unwrap();

    mux.new_session(&name, dir.path(), dir.path(), "sleep 60", NewSessionOptions::default())
        .await
        .unwrap();

    assert!(mux.session_exists(&name).await);
    assert!(mux.list_sessions().await.unwrap().contains(&name));
    assert!(mux.last_activity_epoch(&name).await.unwrap().is_some());

    mux.kill(&name).await.unwrap();
    assert!(!mux.session_exists(&name).await);
    kill_test_session(&name);
}

#[tokio::test]
async fn tmux_nudge_reaches_the_pane() {
    if !tmux_available() {
        eprintln!("skipping test: tmux not available");
        return;
    }
    let mux = TmuxMultiplexer::new();
    let name = unique_name("nudge");
    let dir = tempfile::TempDir::new().unwrap();

    // A bare shell echoes what we type into the pane.
    mux.new_session(&name, dir.path(), dir.path(), "sh", NewSessionOptions::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    mux.nudge(&name, "echo wt-nudge-marker").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let content = mux.capture(&name).await.unwrap();
    assert!(content.contains("wt-nudge-marker"), "capture was: {content}");

    mux.kill(&name).await.unwrap();
    kill_test_session(&name);
}

#[tokio::test]
async fn fake_records_session_lifecycle() {
    let mux = FakeMultiplexer::new();
    let dir = Path::new("/tmp/wt");

    mux.new_session(
        "demo-amazon",
        dir,
        Path::new("/tmp/repo/.beads"),
        "claude",
        NewSessionOptions { port_offset: 1000, port_env: Some("PORT_OFFSET".into()) },
    )
    .await
    .unwrap();

    assert!(mux.session_exists("demo-amazon").await);
    mux.nudge("demo-amazon", "hello").await.unwrap();
    mux.kill("demo-amazon").await.unwrap();
    assert!(!mux.session_exists("demo-amazon").await);

    let calls = mux.calls();
    assert!(matches!(
        &calls[0],
        MuxCall::NewSession { name, port_offset: 1000, .. } if name == "demo-amazon"
    ));
    assert_eq!(mux.nudges("demo-amazon"), vec!["hello".to_string()]);
    assert!(matches!(&calls[2], MuxCall::Kill(name) if name == "demo-amazon"));
}

#[tokio::test]
async fn fake_kill_of_missing_session_errors() {
    let mux = FakeMultiplexer::new();
    assert!(matches!(
        mux.kill("ghost").await,
        Err(MultiplexerError::SessionMissing(_))
    ));
}

#[tokio::test]
async fn fake_scripts_editor_readiness_and_unavailability() {
    let mux = FakeMultiplexer::new();
    mux.add_session("demo-amazon");
    mux.wait_for_editor("demo-amazon", Duration::from_secs(1)).await.unwrap();

    mux.set_editor_ready(false);
    assert!(matches!(
        mux.wait_for_editor("demo-amazon", Duration::from_secs(1)).await,
        Err(MultiplexerError::EditorNotReady(_))
    ));

    mux.set_unavailable();
    assert!(matches!(
        mux.list_sessions().await,
        Err(MultiplexerError::Unavailable(_))
    ));
}

#[test]
fn errors_map_to_core_kinds() {
    let err: wt_core::Error = MultiplexerError::Unavailable("down".into()).into();
    assert!(matches!(err, wt_core::Error::MultiplexerUnavailable(_)));
    let err: wt_core::Error = MultiplexerError::SessionMissing("x".into()).into();
    assert!(matches!(err, wt_core::Error::MultiplexerSessionMissing(_)));
    let err: wt_core::Error = MultiplexerError::EditorNotReady("x".into()).into();
    assert!(matches!(err, wt_core::Error::EditorNotReady(_)));
}
