//! Workspace workflows: create, delete, rename, activate, plus the start-up
//! passes (auto-start and reconciliation).
//!
//! Each workflow mutates a `&mut State` handed in by [`StateStore::update`]
//! and performs its external steps synchronously inside that transaction.
//! Validation happens before the first external call; a workflow that returns
//! `Err` leaves the document as it found it, so the store does not save.
//!
//! [`StateStore::update`]: crate::store::StateStore::update

use crate::{
    config::{AutoStartEntry, Config, RepoConfig},
    git::{self, GitProvider},
    names::{NameGenerator, validate_name},
    paths,
    store::{
        DuplicateSession, State, Workspace, WorkspaceKind, is_managed_session,
        plain_session_name, worktree_session_name,
    },
    tmux::TmuxProvider,
};
use std::{
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

/// A workflow refused or failed to run; the document is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    UnknownRepo(String),
    InvalidName(String),
    DuplicateSession(String),
    NameUnchanged,
    NotFound(String),
    /// git or tmux failed during a blocking step.
    External(String),
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRepo(repo) => write!(f, "unknown repo '{repo}'"),
            Self::InvalidName(reason) | Self::External(reason) => f.write_str(reason),
            Self::DuplicateSession(session) => write!(f, "workspace {session} already exists"),
            Self::NameUnchanged => f.write_str("name unchanged"),
            Self::NotFound(query) => write!(f, "no workspace named '{query}'"),
        }
    }
}

impl std::error::Error for WorkflowError {}

impl From<DuplicateSession> for WorkflowError {
    fn from(err: DuplicateSession) -> Self {
        Self::DuplicateSession(err.0)
    }
}

/// Outcome of a best-effort step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Done,
    NotNeeded,
    Warned(String),
}

impl Cleanup {
    fn from_result(result: anyhow::Result<()>, what: &str) -> Self {
        match result {
            Ok(()) => Cleanup::Done,
            Err(e) => {
                let message = format!("{what}: {e:#}");
                log::warn!("{message}");
                Cleanup::Warned(message)
            }
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Cleanup::Warned(message) => Some(message),
            Cleanup::Done | Cleanup::NotNeeded => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRequest {
    /// `branch: None` asks for a generated branch name.
    Worktree {
        repo: String,
        branch: Option<String>,
    },
    /// `name: None` asks for a generated name; `path: None` means the home directory.
    Plain {
        name: Option<String>,
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct CreateReport {
    pub workspace: Workspace,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DeleteReport {
    pub workspace: Workspace,
    pub session: Cleanup,
    pub worktree: Cleanup,
}

impl DeleteReport {
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        [&self.session, &self.worktree]
            .into_iter()
            .filter_map(Cleanup::warning)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StartReport {
    /// Sessions added by `auto_start`.
    pub added: Vec<String>,
    /// Sessions that were missing and have been recreated.
    pub recreated: Vec<String>,
    /// Namespaced tmux sessions without a record.
    pub orphans: Vec<String>,
    pub warnings: Vec<String>,
}

/// The workflows, bound to a configuration and the two backends.
pub struct Workflows<'a> {
    config: &'a Config,
    git: &'a dyn GitProvider,
    tmux: &'a dyn TmuxProvider,
    default_dir: Option<PathBuf>,
}

impl<'a> Workflows<'a> {
    pub fn new(config: &'a Config, git: &'a dyn GitProvider, tmux: &'a dyn TmuxProvider) -> Self {
        Self {
            config,
            git,
            tmux,
            default_dir: paths::home_dir().ok(),
        }
    }

    /// Directory for plain workspaces created without a path.
    #[must_use]
    pub fn with_default_dir(mut self, dir: PathBuf) -> Self {
        self.default_dir = Some(dir);
        self
    }

    pub fn tmux(&self) -> &dyn TmuxProvider {
        self.tmux
    }

    fn repo(&self, name: &str) -> Result<&'a RepoConfig, WorkflowError> {
        self.config
            .find_repo(name)
            .ok_or_else(|| WorkflowError::UnknownRepo(name.to_string()))
    }

    pub fn create(
        &self,
        state: &mut State,
        request: &CreateRequest,
        names: &mut NameGenerator,
    ) -> Result<CreateReport, WorkflowError> {
        match request {
            CreateRequest::Worktree { repo, branch } => {
                self.create_worktree(state, repo, branch.as_deref(), names)
            }
            CreateRequest::Plain { name, path } => {
                self.create_plain(state, name.as_deref(), path.as_deref(), names)
            }
        }
    }

    fn create_worktree(
        &self,
        state: &mut State,
        repo_name: &str,
        branch: Option<&str>,
        names: &mut NameGenerator,
    ) -> Result<CreateReport, WorkflowError> {
        let repo = self.repo(repo_name)?;
        let branch = match branch.map(str::trim).filter(|b| !b.is_empty()) {
            Some(branch) => {
                validate_name(branch).map_err(WorkflowError::InvalidName)?;
                branch.to_string()
            }
            None => {
                let existing = self.git.list_branches(&repo.path);
                let mut used: HashSet<&str> = existing.iter().map(String::as_str).collect();
                used.extend(state.workspaces.iter().filter_map(|ws| match &ws.kind {
                    WorkspaceKind::Worktree { repo, branch, .. } if repo == repo_name => {
                        Some(branch.as_str())
                    }
                    _ => None,
                }));
                names.generate(&used)
            }
        };

        let session_name = worktree_session_name(repo_name, &branch);
        self.check_unused(state, &session_name)?;

        let mut warnings = Vec::new();
        let (worktree_path, created_worktree) =
            self.prepare_worktree(repo, &branch, &mut warnings)?;

        if created_worktree {
            warnings.extend(run_setup(&repo.setup, &worktree_path));
        }

        if let Err(e) = self.tmux.create_session(&session_name, &worktree_path) {
            if created_worktree {
                Cleanup::from_result(
                    self.git.remove_worktree(&repo.path, &worktree_path),
                    "removing worktree after failed session creation",
                );
            }
            return Err(WorkflowError::External(format!(
                "creating session {session_name}: {e:#}"
            )));
        }

        let workspace =
            Workspace::worktree(repo_name, repo.path.clone(), worktree_path, &branch);
        self.commit(state, workspace, warnings)
    }

    fn create_plain(
        &self,
        state: &mut State,
        name: Option<&str>,
        path: Option<&Path>,
        names: &mut NameGenerator,
    ) -> Result<CreateReport, WorkflowError> {
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                validate_name(name).map_err(WorkflowError::InvalidName)?;
                if name.contains('/') {
                    return Err(WorkflowError::InvalidName(format!(
                        "invalid name '{name}': plain workspace names cannot contain '/'"
                    )));
                }
                name.to_string()
            }
            None => {
                let used: HashSet<&str> = state
                    .workspaces
                    .iter()
                    .filter(|ws| matches!(ws.kind, WorkspaceKind::Plain { .. }))
                    .map(|ws| ws.name.as_str())
                    .collect();
                names.generate(&used)
            }
        };

        let session_name = plain_session_name(&name);
        self.check_unused(state, &session_name)?;

        let dir = match path {
            Some(path) if path.is_dir() => path.to_path_buf(),
            Some(path) => {
                return Err(WorkflowError::NotFound(path.display().to_string()));
            }
            None => self.default_dir.clone().ok_or_else(|| {
                WorkflowError::External("unable to determine home directory".to_string())
            })?,
        };

        self.tmux
            .create_session(&session_name, &dir)
            .map_err(|e| {
                WorkflowError::External(format!("creating session {session_name}: {e:#}"))
            })?;

        self.commit(state, Workspace::plain(&name, dir), Vec::new())
    }

    fn check_unused(&self, state: &State, session_name: &str) -> Result<(), WorkflowError> {
        if state.find_by_session(session_name).is_some() {
            return Err(WorkflowError::DuplicateSession(session_name.to_string()));
        }
        if self.tmux.session_exists(session_name) {
            return Err(WorkflowError::External(format!(
                "tmux session {session_name} already exists but is not tracked; kill it or run `grove start`"
            )));
        }
        Ok(())
    }

    /// Resolve where `branch` lives, creating the managed worktree when needed.
    /// Returns the path and whether this call created it.
    fn prepare_worktree(
        &self,
        repo: &RepoConfig,
        branch: &str,
        warnings: &mut Vec<String>,
    ) -> Result<(PathBuf, bool), WorkflowError> {
        if repo.default_branch.as_deref() == Some(branch) {
            return Ok((repo.path.clone(), false));
        }
        let worktree_path = git::managed_worktree_path(&repo.path, branch);
        if worktree_path.exists() {
            log::info!("reusing existing worktree {}", worktree_path.display());
            return Ok((worktree_path, false));
        }
        if let Err(e) = git::ensure_gitignore(&repo.path) {
            let message = format!("updating .gitignore in {}: {e:#}", repo.path.display());
            log::warn!("{message}");
            warnings.push(message);
        }
        self.git
            .add_worktree(&repo.path, &worktree_path, branch)
            .map_err(|e| WorkflowError::External(format!("{e:#}")))?;
        log::info!("created worktree {}", worktree_path.display());
        Ok((worktree_path, true))
    }

    fn commit(
        &self,
        state: &mut State,
        workspace: Workspace,
        warnings: Vec<String>,
    ) -> Result<CreateReport, WorkflowError> {
        let session_name = workspace.session_name.clone();
        state.add_workspace(workspace)?;
        log::info!("created workspace {session_name}");
        let workspace = state
            .find_by_session(&session_name)
            .cloned()
            .ok_or(WorkflowError::NotFound(session_name))?;
        Ok(CreateReport {
            workspace,
            warnings,
        })
    }

    /// Kill the session, remove a managed worktree, drop the record.
    /// Only the record removal is required; the external steps are best-effort.
    pub fn delete(
        &self,
        state: &mut State,
        session_name: &str,
    ) -> Result<DeleteReport, WorkflowError> {
        let workspace = state
            .find_by_session(session_name)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(session_name.to_string()))?;

        let session = if self.tmux.session_exists(session_name) {
            Cleanup::from_result(
                self.tmux.kill_session(session_name),
                &format!("killing session {session_name}"),
            )
        } else {
            Cleanup::NotNeeded
        };

        let worktree = match &workspace.kind {
            WorkspaceKind::Worktree {
                repo_path,
                worktree_path,
                ..
            } if workspace.owns_worktree() => Cleanup::from_result(
                self.git.remove_worktree(repo_path, worktree_path),
                &format!("removing worktree {}", worktree_path.display()),
            ),
            _ => Cleanup::NotNeeded,
        };

        state.remove_workspace(session_name);
        log::info!("deleted workspace {session_name}");
        Ok(DeleteReport {
            workspace,
            session,
            worktree,
        })
    }

    /// Give a workspace a new branch label or name, renaming its session.
    /// The git branch and the worktree directory are left as they are.
    pub fn rename(
        &self,
        state: &mut State,
        session_name: &str,
        new_name: &str,
    ) -> Result<Workspace, WorkflowError> {
        let workspace = state
            .find_by_session(session_name)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(session_name.to_string()))?;
        let new_name = new_name.trim();
        validate_name(new_name).map_err(WorkflowError::InvalidName)?;
        if new_name == workspace.label() {
            return Err(WorkflowError::NameUnchanged);
        }

        let (new_session, new_display) = match &workspace.kind {
            WorkspaceKind::Worktree { repo, .. } => (
                worktree_session_name(repo, new_name),
                format!("{repo}/{new_name}"),
            ),
            WorkspaceKind::Plain { .. } => {
                if new_name.contains('/') {
                    return Err(WorkflowError::InvalidName(format!(
                        "invalid name '{new_name}': plain workspace names cannot contain '/'"
                    )));
                }
                (plain_session_name(new_name), new_name.to_string())
            }
        };

        if new_session != session_name && state.find_by_session(&new_session).is_some() {
            return Err(WorkflowError::DuplicateSession(new_session));
        }

        if new_session != session_name && self.tmux.session_exists(session_name) {
            self.tmux
                .rename_session(session_name, &new_session)
                .map_err(|e| {
                    WorkflowError::External(format!("renaming session {session_name}: {e:#}"))
                })?;
        }

        let record = state
            .find_by_session_mut(session_name)
            .ok_or_else(|| WorkflowError::NotFound(session_name.to_string()))?;
        record.name = new_display;
        record.session_name.clone_from(&new_session);
        if let WorkspaceKind::Worktree { branch, .. } = &mut record.kind {
            *branch = new_name.to_string();
        }
        let renamed = record.clone();
        if state.last_active.as_deref() == Some(session_name) {
            state.last_active = Some(new_session.clone());
        }
        log::info!("renamed workspace {session_name} to {new_session}");
        Ok(renamed)
    }

    /// Record `session_name` as the active workspace and clear its notification.
    /// The caller persists, releases the lock, then calls [`Self::ensure_session`]
    /// and switches.
    pub fn activate(
        &self,
        state: &mut State,
        session_name: &str,
    ) -> Result<Workspace, WorkflowError> {
        if !state.clear_notification(session_name) {
            return Err(WorkflowError::NotFound(session_name.to_string()));
        }
        state.last_active = Some(session_name.to_string());
        state
            .find_by_session(session_name)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(session_name.to_string()))
    }

    /// Recreate the workspace's session if tmux no longer has it.
    /// Returns true when a session was created.
    pub fn ensure_session(&self, workspace: &Workspace) -> anyhow::Result<bool> {
        if self.tmux.session_exists(&workspace.session_name) {
            return Ok(false);
        }
        let dir = workspace.dir();
        if !dir.is_dir() {
            anyhow::bail!(
                "cannot recreate session {}: {} no longer exists",
                workspace.session_name,
                dir.display()
            );
        }
        self.tmux.create_session(&workspace.session_name, dir)?;
        log::info!("recreated session {}", workspace.session_name);
        Ok(true)
    }

    /// Append a record for every `auto_start` entry not yet tracked.
    ///
    /// Sessions are not created here; [`Self::reconcile`] does that for every
    /// record. Problems with individual entries become warnings.
    pub fn apply_auto_start(&self, state: &mut State, report: &mut StartReport) {
        for entry in &self.config.auto_start {
            match entry {
                AutoStartEntry::Worktrees { repo, worktrees } => {
                    let repo_config = match self.repo(repo) {
                        Ok(repo_config) => repo_config,
                        Err(e) => {
                            report.warnings.push(format!("auto_start: {e}"));
                            continue;
                        }
                    };
                    for branch in worktrees {
                        self.auto_start_worktree(state, repo_config, branch, report);
                    }
                }
                AutoStartEntry::Workspace { workspace, path } => {
                    let session_name = plain_session_name(workspace);
                    if state.find_by_session(&session_name).is_some() {
                        continue;
                    }
                    let Some(dir) = path.clone().or_else(|| self.default_dir.clone()) else {
                        report.warnings.push(format!(
                            "auto_start {workspace}: unable to determine home directory"
                        ));
                        continue;
                    };
                    self.auto_start_add(state, Workspace::plain(workspace, dir), report);
                }
            }
        }
    }

    fn auto_start_worktree(
        &self,
        state: &mut State,
        repo: &RepoConfig,
        branch: &str,
        report: &mut StartReport,
    ) {
        if let Err(reason) = validate_name(branch) {
            report.warnings.push(format!("auto_start {}: {reason}", repo.name));
            return;
        }
        let session_name = worktree_session_name(&repo.name, branch);
        if state.find_by_session(&session_name).is_some() {
            return;
        }
        let mut warnings = Vec::new();
        match self.prepare_worktree(repo, branch, &mut warnings) {
            Ok((worktree_path, created)) => {
                if created {
                    warnings.extend(run_setup(&repo.setup, &worktree_path));
                }
                report.warnings.extend(warnings);
                let workspace =
                    Workspace::worktree(&repo.name, repo.path.clone(), worktree_path, branch);
                self.auto_start_add(state, workspace, report);
            }
            Err(e) => {
                report.warnings.extend(warnings);
                report
                    .warnings
                    .push(format!("auto_start {}/{branch}: {e}", repo.name));
            }
        }
    }

    fn auto_start_add(&self, state: &mut State, workspace: Workspace, report: &mut StartReport) {
        let session_name = workspace.session_name.clone();
        match state.add_workspace(workspace) {
            Ok(()) => {
                log::info!("auto_start added {session_name}");
                report.added.push(session_name);
            }
            Err(e) => report.warnings.push(format!("auto_start: {e}")),
        }
    }

    /// Bring tmux in line with the document: recreate missing sessions and
    /// list namespaced sessions that have no record.
    pub fn reconcile(&self, state: &State, report: &mut StartReport) {
        for workspace in &state.workspaces {
            match self.ensure_session(workspace) {
                Ok(true) => report.recreated.push(workspace.session_name.clone()),
                Ok(false) => {}
                Err(e) => {
                    let message = format!("{e:#}");
                    log::warn!("{message}");
                    report.warnings.push(message);
                }
            }
        }

        let tracked: HashSet<&str> = state
            .workspaces
            .iter()
            .map(|ws| ws.session_name.as_str())
            .collect();
        report.orphans = self
            .tmux
            .list_sessions()
            .into_iter()
            .filter(|s| is_managed_session(s) && !tracked.contains(s.as_str()))
            .collect();
    }
}

/// Run each setup command with `sh -c` in `dir`; failures become warnings.
fn run_setup(commands: &[String], dir: &Path) -> Vec<String> {
    let mut warnings = Vec::new();
    for command in commands {
        log::debug!("setup in {}: {command}", dir.display());
        let result = Command::new("sh")
            .args(["-c", command])
            .current_dir(dir)
            .output();
        let failure = match result {
            Ok(output) if output.status.success() => continue,
            Ok(output) => format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => e.to_string(),
        };
        let message = format!("setup command `{command}` failed: {failure}");
        log::warn!("{message}");
        warnings.push(message);
    }
    warnings
}
