// SPDX-License-Identifier: MIT

use super::*;

#[tokio::test]
async fn successful_command_returns_output() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo hello"]);
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo").await.unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_trimmed(&output), "hello");
}

#[tokio::test]
async fn missing_binary_is_reported_as_missing() {
    let cmd = Command::new("wt-definitely-not-a-real-binary");
    let err = run_with_timeout(cmd, Duration::from_secs(5), "missing").await.unwrap_err();
    assert!(matches!(err, SubprocessError::Missing { .. }));
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "sleep 30"]);
    let err = run_with_timeout(cmd, Duration::from_millis(50), "sleep").await.unwrap_err();
    assert!(matches!(err, SubprocessError::Timeout { .. }));
}

#[tokio::test]
async fn run_ok_surfaces_stderr() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo broken >&2; exit 3"]);
    let err = run_ok(cmd, Duration::from_secs(5), "failing").await.unwrap_err();
    match err {
        SubprocessError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn stderr_line_falls_back_to_stdout_then_status() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo only stdout"]);
    let mut output = run_with_timeout(cmd, Duration::from_secs(5), "echo").await.unwrap();
    assert_eq!(stderr_line(&output), "only stdout");

    output.stdout.clear();
    assert!(stderr_line(&output).starts_with("exit status"));
}
