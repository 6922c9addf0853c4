// SPDX-License-Identifier: MIT

//! Session creation: the `new` transition of the state machine.

use std::path::PathBuf;
use std::time::Duration;

use super::Orchestrator;
use crate::prompt;
use wt_adapters::{git, testenv, IssueStore, MergeDriver, Multiplexer, NotifyAdapter};
use wt_adapters::multiplexer::NewSessionOptions;
use wt_core::{
    Clock, CompletionCondition, Error, Project, Session, SessionKind, SessionStatus,
};
use wt_storage::namepool;

/// How long to wait for the editor to draw its prompt.
const EDITOR_READY_TIMEOUT: Duration = Duration::from_secs(120);
/// How long to wait for the test env to become healthy.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(60);

/// What to do with the caller's terminal after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchMode {
    /// Attach from outside the multiplexer.
    Attach,
    /// Switch the current client (caller already inside).
    Switch,
    /// Leave the session detached.
    #[default]
    None,
}

/// Options for creating a session.
#[derive(Debug, Clone, Default)]
pub struct NewOptions {
    /// Explicit repository path; otherwise the project registry (or the
    /// enclosing git root) decides.
    pub repo: Option<PathBuf>,
    /// Explicit session name, bypassing the theme pool.
    pub name: Option<String>,
    pub switch: SwitchMode,
    /// Skip test-env setup even when the project configures one.
    pub no_test_env: bool,
}

impl<M, I, D, N, C> Orchestrator<M, I, D, N, C>
where
    M: Multiplexer,
    I: IssueStore,
    D: MergeDriver,
    N: NotifyAdapter,
    C: Clock,
{
    /// Create a session for a bead. Fails with `BeadInUse` when the bead
    /// already has an active session, and rolls the worktree back when any
    /// later step fails.
    pub async fn new_bead_session(&self, bead: &str, opts: NewOptions) -> Result<Session, Error> {
        if let Some(existing) = self.sessions.find_by_bead(bead)? {
            return Err(Error::BeadInUse { bead: bead.to_string(), session: existing.name });
        }

        // Validate the bead first, before any repo resolution, so a bad id
        // always surfaces as BeadNotFound. `bd` discovers its store from
        // the directory it runs in: the prefix-matched project's repo when
        // one is registered, the caller's directory otherwise.
        let bead_dir = self
            .registry
            .find_by_bead_prefix(bead)?
            .map(|p| p.repo_path)
            .or_else(|| opts.repo.clone())
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| self.paths.dir().to_path_buf());
        let title = self.issues.show(&bead_dir, bead).await.map_err(Error::from)?.title;

        let project = self.resolve_project(bead, &opts).await?;

        let kind = SessionKind::Bead { bead: bead.to_string() };
        let initial = prompt::bead_prompt(bead, &title, project.merge_mode);
        self.provision(project, kind, bead.to_string(), initial, opts).await
    }

    /// Create a task session: same pipeline, no bead validation, branch
    /// named after the session.
    pub async fn new_task_session(
        &self,
        description: &str,
        condition: CompletionCondition,
        project_name: Option<&str>,
        opts: NewOptions,
    ) -> Result<Session, Error> {
        let project = match project_name {
            Some(name) => self.registry.get(name)?,
            None => self.project_from_cwd(&opts).await?,
        };

        let kind = SessionKind::Task { description: description.to_string(), condition };
        let initial = prompt::task_prompt(description, condition, project.merge_mode);
        // Branch is filled in after the name allocation.
        self.provision(project, kind, String::new(), initial, opts).await
    }

    /// Resolve the owning project for a bead: explicit repo flag first,
    /// then the bead prefix, then the enclosing git root.
    async fn resolve_project(&self, bead: &str, opts: &NewOptions) -> Result<Project, Error> {
        if let Some(repo) = &opts.repo {
            let root = git::find_git_root(repo).await?;
            let url = git::origin_url(&root).await?;
            if let Some(project) = self.registry.find_by_repo_url(&url)? {
                return Ok(project);
            }
            let mut project = Project::new(bead_prefix_of(bead), root);
            project.repo_url = url;
            return Ok(project);
        }
        if let Some(project) = self.registry.find_by_bead_prefix(bead)? {
            return Ok(project);
        }
        self.project_from_cwd(opts).await
    }

    /// Fallback project derived from the enclosing git work tree.
    async fn project_from_cwd(&self, opts: &NewOptions) -> Result<Project, Error> {
        let base = opts
            .repo
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .ok_or(Error::NotInSession)?;
        let root = git::find_git_root(&base).await?;
        let url = git::origin_url(&root).await?;
        if let Some(project) = self.registry.find_by_repo_url(&url)? {
            return Ok(project);
        }
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("repo")
            .to_string();
        let mut project = Project::new(name, root);
        project.repo_url = url;
        Ok(project)
    }

    /// Shared provisioning pipeline: allocate name → worktree → port →
    /// multiplexer → test env → hooks → store → event → prompt → switch.
    async fn provision(
        &self,
        project: Project,
        kind: SessionKind,
        branch: String,
        initial_prompt: String,
        opts: NewOptions,
    ) -> Result<Session, Error> {
        let (session_name, theme_name) = match &opts.name {
            Some(name) => (name.clone(), None),
            None => {
                let used = self.sessions.used_names()?;
                let allocation = namepool::allocate(&project.name, &used)?;
                (format!("{}-{}", project.name, allocation.name), Some(allocation.name))
            }
        };

        let sessions = self.sessions.load()?;
        if sessions.contains_key(&session_name) {
            return Err(Error::SessionExists(session_name));
        }
        if self.mux.session_exists(&session_name).await {
            return Err(Error::SessionExists(session_name));
        }

        let branch = if branch.is_empty() { format!("task/{session_name}") } else { branch };
        let worktree = self.config.worktree_root.join(&session_name);
        git::create(&project.repo_path, &worktree, &branch).await?;
        if let Err(e) = git::symlink_claude_dir(&project.repo_path, &worktree) {
            tracing::warn!(error = %e, "claude dir symlink failed");
        }

        // Everything past this point rolls back on failure: kill the
        // multiplexer session, drop the store record, remove the worktree.
        let session = match self
            .provision_inner(
                &project,
                kind,
                branch,
                &session_name,
                theme_name,
                &worktree,
                &initial_prompt,
                &opts,
            )
            .await
        {
            Ok(session) => session,
            Err(e) => {
                let _ = self.mux.kill(&session_name).await;
                let _ = self.sessions.with_lock(|sessions| {
                    sessions.remove(&session_name);
                    Ok(())
                });
                if let Err(cleanup) = git::remove(&worktree).await {
                    tracing::warn!(error = %cleanup, "worktree rollback failed");
                }
                return Err(e);
            }
        };

        // The session is live; a failed attach/switch does not undo it.
        match opts.switch {
            SwitchMode::Attach => self.mux.attach(&session_name).await?,
            SwitchMode::Switch => self.mux.switch_client(&session_name).await?,
            SwitchMode::None => {}
        }

        Ok(session)
    }

    #[allow(clippy::too_many_arguments)]
    async fn provision_inner(
        &self,
        project: &Project,
        kind: SessionKind,
        branch: String,
        session_name: &str,
        theme_name: Option<String>,
        worktree: &std::path::Path,
        initial_prompt: &str,
        opts: &NewOptions,
    ) -> Result<Session, Error> {
        let test_env = if opts.no_test_env { None } else { project.test_env.as_ref() };

        let port_offset = match test_env {
            Some(_) => {
                let used = self.used_port_offsets()?;
                testenv::allocate_port_offset(project, &used)?
            }
            None => 0,
        };

        let beads_dir = project.repo_path.join(".beads");
        self.mux
            .new_session(
                session_name,
                worktree,
                &beads_dir,
                &self.config.editor_cmd,
                NewSessionOptions {
                    port_offset,
                    port_env: test_env.map(|env| env.port_env.clone()),
                },
            )
            .await?;

        if let Some(env) = test_env {
            testenv::run_setup(env, worktree, port_offset).await?;
            testenv::wait_for_healthy(env, worktree, port_offset, HEALTH_TIMEOUT).await?;
        }

        if !project.on_create.is_empty() {
            let port_env = test_env.map(|env| env.port_env.as_str()).unwrap_or("PORT_OFFSET");
            testenv::run_hooks(&project.on_create, worktree, (port_env, port_offset)).await?;
        }

        let now = self.clock.now_utc();
        let session = Session {
            name: session_name.to_string(),
            project: project.name.clone(),
            worktree: worktree.to_path_buf(),
            branch,
            port_offset,
            beads_dir,
            created_at: now,
            last_activity: now,
            status: SessionStatus::Working,
            status_message: None,
            theme_name,
            kind,
        };

        self.sessions.with_lock(|sessions| {
            if sessions.contains_key(session_name) {
                return Err(Error::SessionExists(session_name.to_string()));
            }
            sessions.insert(session_name.to_string(), session.clone());
            Ok(())
        })?;

        if let Err(e) = self.events.log_session_start(now, &session, None) {
            tracing::warn!(session = session_name, error = %e, "session_start event write failed");
        }

        self.mux.wait_for_editor(session_name, EDITOR_READY_TIMEOUT).await?;
        self.mux.nudge(session_name, initial_prompt).await?;

        Ok(session)
    }
}

/// All dash-separated parts of a bead id except the last.
fn bead_prefix_of(bead: &str) -> &str {
    bead.rsplit_once('-').map(|(prefix, _)| prefix).unwrap_or(bead)
}
