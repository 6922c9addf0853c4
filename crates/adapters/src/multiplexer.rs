// SPDX-License-Identifier: MIT

//! Terminal multiplexer driver (tmux).
//!
//! Every session runs the AI editor inside a detached tmux session keyed
//! by the wt session name. The driver is a trait so the engine can run
//! against a recording fake.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::subprocess::{self, run_with_timeout, TMUX_TIMEOUT};

/// Pane content markers that indicate the editor has drawn its prompt.
const EDITOR_READY_MARKERS: [&str; 3] = ["╭", "❯", "? for shortcuts"];

/// Poll interval for `wait_for_editor`.
const EDITOR_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum MultiplexerError {
    #[error("no multiplexer server reachable: {0}")]
    Unavailable(String),

    #[error("multiplexer session '{0}' is missing")]
    SessionMissing(String),

    #[error("editor in session '{0}' did not become ready")]
    EditorNotReady(String),

    #[error("multiplexer command failed: {0}")]
    CommandFailed(String),
}

impl From<MultiplexerError> for wt_core::Error {
    fn from(e: MultiplexerError) -> Self {
        match e {
            MultiplexerError::Unavailable(msg) => wt_core::Error::MultiplexerUnavailable(msg),
            MultiplexerError::SessionMissing(name) => {
                wt_core::Error::MultiplexerSessionMissing(name)
            }
            MultiplexerError::EditorNotReady(name) => wt_core::Error::EditorNotReady(name),
            MultiplexerError::CommandFailed(msg) => wt_core::Error::MultiplexerUnavailable(msg),
        }
    }
}

/// Options for `new_session`.
#[derive(Debug, Clone, Default)]
pub struct NewSessionOptions {
    /// Test-env port offset; 0 means unassigned.
    pub port_offset: u16,
    /// Environment variable name to carry the offset.
    pub port_env: Option<String>,
}

#[async_trait]
pub trait Multiplexer: Send + Sync + 'static {
    /// Create a detached session running `editor_cmd` in `workdir`, with
    /// BEADS_DIR and WT_SESSION set (plus the port env var when a nonzero
    /// offset was allocated).
    async fn new_session(
        &self,
        name: &str,
        workdir: &Path,
        beads_dir: &Path,
        editor_cmd: &str,
        opts: NewSessionOptions,
    ) -> Result<(), MultiplexerError>;

    /// Foreground attach (takes over the terminal).
    async fn attach(&self, name: &str) -> Result<(), MultiplexerError>;

    /// Switch the current client to `name` (caller is already inside the
    /// multiplexer).
    async fn switch_client(&self, name: &str) -> Result<(), MultiplexerError>;

    async fn kill(&self, name: &str) -> Result<(), MultiplexerError>;

    /// Enqueue `text` into the session's primary terminal, then press
    /// Enter.
    async fn nudge(&self, name: &str, text: &str) -> Result<(), MultiplexerError>;

    /// Poll until the editor is visibly ready, or time out.
    async fn wait_for_editor(&self, name: &str, timeout: Duration)
        -> Result<(), MultiplexerError>;

    /// Session name for the current client; empty when not inside the
    /// multiplexer.
    async fn current_session(&self) -> Result<String, MultiplexerError>;

    async fn session_exists(&self, name: &str) -> bool;

    async fn list_sessions(&self) -> Result<Vec<String>, MultiplexerError>;

    /// Visible pane content, most recent lines last.
    async fn capture(&self, name: &str) -> Result<String, MultiplexerError>;

    /// Epoch seconds of the session's last activity, `None` when the
    /// session is gone.
    async fn last_activity_epoch(&self, name: &str) -> Result<Option<u64>, MultiplexerError>;
}

/// Production driver shelling out to `tmux`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TmuxMultiplexer;

impl TmuxMultiplexer {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[&str], label: &str) -> Result<std::process::Output, MultiplexerError> {
        let mut cmd = Command::new("tmux");
        cmd.args(args);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, label)
            .await
            .map_err(|e| match e {
                subprocess::SubprocessError::Missing { .. } => {
                    MultiplexerError::Unavailable("tmux is not installed".into())
                }
                other => MultiplexerError::CommandFailed(other.to_string()),
            })?;
        if !output.status.success() {
            let stderr = subprocess::stderr_line(&output);
            if stderr.contains("no server running") || stderr.contains("error connecting") {
                return Err(MultiplexerError::Unavailable(stderr));
            }
            return Err(MultiplexerError::CommandFailed(format!("{label}: {stderr}")));
        }
        Ok(output)
    }
}

#[async_trait]
impl Multiplexer for TmuxMultiplexer {
    async fn new_session(
        &self,
        name: &str,
        workdir: &Path,
        beads_dir: &Path,
        editor_cmd: &str,
        opts: NewSessionOptions,
    ) -> Result<(), MultiplexerError> {
        let beads_env = format!("BEADS_DIR={}", beads_dir.display());
        let session_env = format!("WT_SESSION={name}");
        let workdir = workdir.display().to_string();

        let mut args: Vec<String> = vec![
            "new-session".into(),
            "-d".into(),
            "-s".into(),
            name.into(),
            "-c".into(),
            workdir,
            "-e".into(),
            beads_env,
            "-e".into(),
            session_env,
        ];
        if opts.port_offset > 0 {
            let var = opts.port_env.as_deref().unwrap_or("PORT_OFFSET");
            args.push("-e".into());
            args.push(format!("{var}={}", opts.port_offset));
        }
        args.push(editor_cmd.into());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs, "tmux new-session").await?;
        Ok(())
    }

    async fn attach(&self, name: &str) -> Result<(), MultiplexerError> {
        // Interactive: hands the terminal to tmux until detach.
        let status = std::process::Command::new("tmux")
            .args(["attach", "-t", name])
            .status()
            .map_err(|e| MultiplexerError::Unavailable(e.to_string()))?;
        if !status.success() {
            return Err(MultiplexerError::SessionMissing(name.to_string()));
        }
        Ok(())
    }

    async fn switch_client(&self, name: &str) -> Result<(), MultiplexerError> {
        self.run(&["switch-client", "-t", name], "tmux switch-client").await?;
        Ok(())
    }

    async fn kill(&self, name: &str) -> Result<(), MultiplexerError> {
        self.run(&["kill-session", "-t", name], "tmux kill-session").await?;
        Ok(())
    }

    async fn nudge(&self, name: &str, text: &str) -> Result<(), MultiplexerError> {
        // -l sends the payload literally; Enter goes as a separate key
        // press so the editor sees one submitted line.
        self.run(&["send-keys", "-t", name, "-l", text], "tmux send-keys").await?;
        self.run(&["send-keys", "-t", name, "Enter"], "tmux send-keys").await?;
        Ok(())
    }

    async fn wait_for_editor(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<(), MultiplexerError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.capture(name).await {
                Ok(content) => {
                    if EDITOR_READY_MARKERS.iter().any(|m| content.contains(m)) {
                        return Ok(());
                    }
                }
                Err(MultiplexerError::Unavailable(e)) => {
                    return Err(MultiplexerError::Unavailable(e));
                }
                Err(_) => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(MultiplexerError::EditorNotReady(name.to_string()));
            }
            tokio::time::sleep(EDITOR_POLL).await;
        }
    }

    async fn current_session(&self) -> Result<String, MultiplexerError> {
        if std::env::var_os("TMUX").is_none() {
            return Ok(String::new());
        }
        let output = self.run(&["display-message", "-p", "#S"], "tmux display-message").await?;
        Ok(subprocess::stdout_trimmed(&output))
    }

    async fn session_exists(&self, name: &str) -> bool {
        let mut cmd = Command::new("tmux");
        cmd.args(["has-session", "-t", name]);
        matches!(
            run_with_timeout(cmd, TMUX_TIMEOUT, "tmux has-session").await,
            Ok(output) if output.status.success()
        )
    }

    async fn list_sessions(&self) -> Result<Vec<String>, MultiplexerError> {
        let output =
            self.run(&["list-sessions", "-F", "#{session_name}"], "tmux list-sessions").await?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .filter(|l| !l.is_empty())
            .collect())
    }

    async fn capture(&self, name: &str) -> Result<String, MultiplexerError> {
        let output = self
            .run(&["capture-pane", "-t", name, "-p", "-S", "-40"], "tmux capture-pane")
            .await
            .map_err(|e| match e {
                MultiplexerError::CommandFailed(_) => {
                    MultiplexerError::SessionMissing(name.to_string())
                }
                other => other,
            })?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn last_activity_epoch(&self, name: &str) -> Result<Option<u64>, MultiplexerError> {
        let output = self
            .run(
                &["display-message", "-p", "-t", name, "#{session_activity}"],
                "tmux display-message",
            )
            .await;
        match output {
            Ok(output) => Ok(subprocess::stdout_trimmed(&output).parse().ok()),
            Err(MultiplexerError::CommandFailed(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Multiplexer, MultiplexerError, NewSessionOptions};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    /// Recorded call for assertions.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MuxCall {
        NewSession { name: String, workdir: PathBuf, editor_cmd: String, port_offset: u16 },
        Attach(String),
        SwitchClient(String),
        Kill(String),
        Nudge { name: String, text: String },
        WaitForEditor(String),
    }

    #[derive(Default)]
    struct FakeState {
        calls: Vec<MuxCall>,
        sessions: HashSet<String>,
        current: String,
        captures: HashMap<String, String>,
        activity: HashMap<String, u64>,
        editor_ready: bool,
        fail_new_session: bool,
        unavailable: bool,
    }

    /// Recording multiplexer for engine tests.
    #[derive(Clone, Default)]
    pub struct FakeMultiplexer {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeMultiplexer {
        pub fn new() -> Self {
            let fake = Self::default();
            fake.inner.lock().editor_ready = true;
            fake
        }

        pub fn calls(&self) -> Vec<MuxCall> {
            self.inner.lock().calls.clone()
        }

        pub fn nudges(&self, name: &str) -> Vec<String> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter_map(|c| match c {
                    MuxCall::Nudge { name: n, text } if n == name => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn session_names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.inner.lock().sessions.iter().cloned().collect();
            names.sort();
            names
        }

        pub fn add_session(&self, name: &str) {
            self.inner.lock().sessions.insert(name.to_string());
        }

        pub fn set_current(&self, name: &str) {
            self.inner.lock().current = name.to_string();
        }

        pub fn set_capture(&self, name: &str, content: &str) {
            self.inner.lock().captures.insert(name.to_string(), content.to_string());
        }

        pub fn set_activity(&self, name: &str, epoch: u64) {
            self.inner.lock().activity.insert(name.to_string(), epoch);
        }

        pub fn set_editor_ready(&self, ready: bool) {
            self.inner.lock().editor_ready = ready;
        }

        pub fn fail_new_session(&self) {
            self.inner.lock().fail_new_session = true;
        }

        pub fn set_unavailable(&self) {
            self.inner.lock().unavailable = true;
        }

        fn check_available(&self) -> Result<(), MultiplexerError> {
            if self.inner.lock().unavailable {
                return Err(MultiplexerError::Unavailable("fake server down".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Multiplexer for FakeMultiplexer {
        async fn new_session(
            &self,
            name: &str,
            workdir: &Path,
            _beads_dir: &Path,
            editor_cmd: &str,
            opts: NewSessionOptions,
        ) -> Result<(), MultiplexerError> {
            self.check_available()?;
            let mut state = self.inner.lock();
            state.calls.push(MuxCall::NewSession {
                name: name.to_string(),
                workdir: workdir.to_path_buf(),
                editor_cmd: editor_cmd.to_string(),
                port_offset: opts.port_offset,
            });
            if state.fail_new_session {
                return Err(MultiplexerError::CommandFailed("scripted failure".into()));
            }
            state.sessions.insert(name.to_string());
            Ok(())
        }

        async fn attach(&self, name: &str) -> Result<(), MultiplexerError> {
            self.check_available()?;
            self.inner.lock().calls.push(MuxCall::Attach(name.to_string()));
            Ok(())
        }

        async fn switch_client(&self, name: &str) -> Result<(), MultiplexerError> {
            self.check_available()?;
            self.inner.lock().calls.push(MuxCall::SwitchClient(name.to_string()));
            Ok(())
        }

        async fn kill(&self, name: &str) -> Result<(), MultiplexerError> {
            self.check_available()?;
            let mut state = self.inner.lock();
            state.calls.push(MuxCall::Kill(name.to_string()));
            if !state.sessions.remove(name) {
                return Err(MultiplexerError::SessionMissing(name.to_string()));
            }
            Ok(())
        }

        async fn nudge(&self, name: &str, text: &str) -> Result<(), MultiplexerError> {
            self.check_available()?;
            let mut state = self.inner.lock();
            if !state.sessions.contains(name) {
                return Err(MultiplexerError::SessionMissing(name.to_string()));
            }
            state
                .calls
                .push(MuxCall::Nudge { name: name.to_string(), text: text.to_string() });
            Ok(())
        }

        async fn wait_for_editor(
            &self,
            name: &str,
            _timeout: Duration,
        ) -> Result<(), MultiplexerError> {
            self.check_available()?;
            let mut state = self.inner.lock();
            state.calls.push(MuxCall::WaitForEditor(name.to_string()));
            if state.editor_ready {
                Ok(())
            } else {
                Err(MultiplexerError::EditorNotReady(name.to_string()))
            }
        }

        async fn current_session(&self) -> Result<String, MultiplexerError> {
            self.check_available()?;
            Ok(self.inner.lock().current.clone())
        }

        async fn session_exists(&self, name: &str) -> bool {
            self.inner.lock().sessions.contains(name)
        }

        async fn list_sessions(&self) -> Result<Vec<String>, MultiplexerError> {
            self.check_available()?;
            Ok(self.session_names())
        }

        async fn capture(&self, name: &str) -> Result<String, MultiplexerError> {
            self.check_available()?;
            let state = self.inner.lock();
            state
                .captures
                .get(name)
                .cloned()
                .ok_or_else(|| MultiplexerError::SessionMissing(name.to_string()))
        }

        async fn last_activity_epoch(&self, name: &str) -> Result<Option<u64>, MultiplexerError> {
            self.check_available()?;
            Ok(self.inner.lock().activity.get(name).copied())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMultiplexer, MuxCall};

#[cfg(test)]
#[path = "multiplexer_tests.rs"]
mod tests;
