//! Persistent workspace registry.
//!
//! The document lives in `state.json` inside the state directory and is
//! guarded by an advisory exclusive lock on `state.lock`. Every
//! read-modify-write cycle goes through [`StateStore::update`], which holds
//! the lock for the duration of the closure and replaces the document
//! atomically (temp file + rename).

use crate::constants::{
    SESSION_NAMESPACE, STATE_FILE_NAME, STATE_LOCK_FILE_NAME, STATE_VERSION,
};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkspaceKind {
    /// A git worktree of a configured repository.
    Worktree {
        repo: String,
        repo_path: PathBuf,
        worktree_path: PathBuf,
        branch: String,
    },
    /// A session rooted at an arbitrary directory.
    Plain { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    #[serde(flatten)]
    pub kind: WorkspaceKind,
    pub session_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

impl Workspace {
    pub fn worktree(
        repo: &str,
        repo_path: PathBuf,
        worktree_path: PathBuf,
        branch: &str,
    ) -> Self {
        Self {
            name: format!("{repo}/{branch}"),
            session_name: worktree_session_name(repo, branch),
            kind: WorkspaceKind::Worktree {
                repo: repo.to_string(),
                repo_path,
                worktree_path,
                branch: branch.to_string(),
            },
            created_at: None,
            notification: None,
        }
    }

    pub fn plain(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            session_name: plain_session_name(name),
            kind: WorkspaceKind::Plain { path },
            created_at: None,
            notification: None,
        }
    }

    pub fn repo(&self) -> Option<&str> {
        match &self.kind {
            WorkspaceKind::Worktree { repo, .. } => Some(repo),
            WorkspaceKind::Plain { .. } => None,
        }
    }

    /// Directory the tmux session is started in.
    pub fn dir(&self) -> &Path {
        match &self.kind {
            WorkspaceKind::Worktree { worktree_path, .. } => worktree_path,
            WorkspaceKind::Plain { path } => path,
        }
    }

    /// Label shown in the sidebar: the branch for worktrees, the name otherwise.
    pub fn label(&self) -> &str {
        match &self.kind {
            WorkspaceKind::Worktree { branch, .. } => branch,
            WorkspaceKind::Plain { .. } => &self.name,
        }
    }

    /// True when the worktree path is a separate checkout that grove may remove.
    pub fn owns_worktree(&self) -> bool {
        matches!(
            &self.kind,
            WorkspaceKind::Worktree { repo_path, worktree_path, .. } if repo_path != worktree_path
        )
    }
}

/// tmux rewrites `.` and `:` in session names; keep identifiers stable.
fn sanitize_session_segment(segment: &str) -> String {
    segment.replace(['.', ':'], "_")
}

pub fn worktree_session_name(repo: &str, branch: &str) -> String {
    format!(
        "{SESSION_NAMESPACE}/{}/{}",
        sanitize_session_segment(repo),
        sanitize_session_segment(branch)
    )
}

pub fn plain_session_name(name: &str) -> String {
    format!("{SESSION_NAMESPACE}/{}", sanitize_session_segment(name))
}

pub fn is_managed_session(session_name: &str) -> bool {
    session_name
        .strip_prefix(SESSION_NAMESPACE)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub version: u32,
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<String>,
    /// Repos folded in the sidebar; every other repo is expanded.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub collapsed: BTreeSet<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            workspaces: Vec::new(),
            last_active: None,
            collapsed: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSession(pub String);

impl std::fmt::Display for DuplicateSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "workspace session {} already exists", self.0)
    }
}

impl std::error::Error for DuplicateSession {}

impl State {
    /// Append a workspace, stamping `created_at` on first insertion.
    pub fn add_workspace(&mut self, mut workspace: Workspace) -> Result<(), DuplicateSession> {
        if self.find_by_session(&workspace.session_name).is_some() {
            return Err(DuplicateSession(workspace.session_name));
        }
        if workspace.created_at.is_none() {
            workspace.created_at = Some(Utc::now());
        }
        self.workspaces.push(workspace);
        Ok(())
    }

    /// Remove the workspace bound to `session_name`. Removing an unknown session is a no-op.
    pub fn remove_workspace(&mut self, session_name: &str) -> Option<Workspace> {
        let idx = self
            .workspaces
            .iter()
            .position(|w| w.session_name == session_name)?;
        if self.last_active.as_deref() == Some(session_name) {
            self.last_active = None;
        }
        Some(self.workspaces.remove(idx))
    }

    /// Look up by session identifier first, then by the namespaced form of
    /// `query`, then by display name.
    pub fn find_workspace(&self, query: &str) -> Option<&Workspace> {
        self.find_by_session(query)
            .or_else(|| self.find_by_session(&plain_session_name(query)))
            .or_else(|| self.workspaces.iter().find(|w| w.name == query))
    }

    pub fn find_by_session(&self, session_name: &str) -> Option<&Workspace> {
        self.workspaces
            .iter()
            .find(|w| w.session_name == session_name)
    }

    pub fn find_by_session_mut(&mut self, session_name: &str) -> Option<&mut Workspace> {
        self.workspaces
            .iter_mut()
            .find(|w| w.session_name == session_name)
    }

    /// Returns false when no workspace is bound to `session_name`.
    pub fn set_notification(&mut self, session_name: &str, message: &str) -> bool {
        match self.find_by_session_mut(session_name) {
            Some(ws) => {
                ws.notification = Some(message.to_string());
                true
            }
            None => false,
        }
    }

    pub fn clear_notification(&mut self, session_name: &str) -> bool {
        match self.find_by_session_mut(session_name) {
            Some(ws) => {
                ws.notification = None;
                true
            }
            None => false,
        }
    }

    /// Flip a repo between expanded and collapsed; returns true when it is now collapsed.
    pub fn toggle_collapsed(&mut self, repo: &str) -> bool {
        if self.collapsed.remove(repo) {
            false
        } else {
            self.collapsed.insert(repo.to_string());
            true
        }
    }
}

/// Holds the exclusive advisory lock on the state file until released or dropped.
pub struct StateLock {
    guard: Option<Flock<File>>,
}

impl StateLock {
    /// Release the lock. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if let Some(guard) = self.guard.take()
            && let Err((_, errno)) = guard.unlock()
        {
            log::warn!("failed to release state lock: {errno}");
        }
    }

    pub fn is_held(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the XDG state directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::paths::state_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE_NAME)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(STATE_LOCK_FILE_NAME)
    }

    /// Block until the exclusive lock is acquired.
    pub fn lock(&self) -> Result<StateLock> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating state directory {}", self.dir.display()))?;
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("opening lock file {}", lock_path.display()))?;
        let guard = Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_, errno)| anyhow::anyhow!("acquiring state lock: {errno}"))?;
        Ok(StateLock { guard: Some(guard) })
    }

    /// Read the document. A missing file yields an empty version-1 document;
    /// any other read or parse failure is returned as an error.
    pub fn load(&self) -> Result<State> {
        let path = self.state_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(State::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading state file {}", path.display()));
            }
        };
        let state: State = serde_json::from_str(&contents)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        if state.version > STATE_VERSION {
            bail!(
                "state file {} has version {}, newer than supported version {STATE_VERSION}",
                path.display(),
                state.version
            );
        }
        Ok(state)
    }

    /// Replace the document atomically. Callers must hold the lock.
    pub fn save(&self, state: &State) -> Result<()> {
        let tmp = self.stage(state)?;
        self.commit(&tmp)
    }

    /// Write the serialized document to a temp file next to the target.
    pub(crate) fn stage(&self, state: &State) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating state directory {}", self.dir.display()))?;
        let mut contents =
            serde_json::to_string_pretty(state).context("serializing state document")?;
        contents.push('\n');

        let tmp = self
            .dir
            .join(format!("{STATE_FILE_NAME}.tmp.{}", std::process::id()));
        let write = || -> Result<()> {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)
                .with_context(|| format!("creating temp file {}", tmp.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("writing temp file {}", tmp.display()))?;
            file.sync_all()
                .with_context(|| format!("syncing temp file {}", tmp.display()))?;
            Ok(())
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(tmp)
    }

    pub(crate) fn commit(&self, tmp: &Path) -> Result<()> {
        let target = self.state_path();
        if let Err(e) = fs::rename(tmp, &target) {
            let _ = fs::remove_file(tmp);
            return Err(e).with_context(|| format!("replacing state file {}", target.display()));
        }
        if let Ok(dir) = File::open(&self.dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    /// Locked read-modify-write cycle.
    ///
    /// Acquires the lock, loads the latest document and runs `mutate` on it.
    /// When `mutate` succeeds the document is saved; when it fails nothing is
    /// written. The outer error carries lock and persistence failures, the
    /// inner one the closure's own failure. The document returned is the one
    /// on disk once the lock is released.
    pub fn update<T, E>(
        &self,
        mutate: impl FnOnce(&mut State) -> Result<T, E>,
    ) -> Result<(State, Result<T, E>)> {
        let mut lock = self.lock()?;
        let mut state = self.load()?;
        let snapshot = state.clone();
        let outcome = mutate(&mut state);
        let state = if outcome.is_ok() {
            self.save(&state)?;
            state
        } else {
            snapshot
        };
        lock.release();
        Ok((state, outcome))
    }
}
