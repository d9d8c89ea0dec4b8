use super::{Worktree, provider::GitProvider};
use anyhow::Result;
use std::{
    cell::RefCell,
    path::{Path, PathBuf},
};

/// In-memory git backend for tests. Records every mutating call; queued
/// results are returned once, after which calls succeed.
#[derive(Default)]
pub struct MockGitProvider {
    pub branches: Vec<String>,
    pub worktrees: Vec<Worktree>,
    pub add_worktree_result: RefCell<Option<Result<()>>>,
    pub remove_worktree_result: RefCell<Option<Result<()>>>,
    /// `(repo_path, worktree_path, branch)`
    pub added: RefCell<Vec<(PathBuf, PathBuf, String)>>,
    /// `(repo_path, worktree_path)`
    pub removed: RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl MockGitProvider {
    pub fn fail_add_worktree(&self, message: &str) {
        *self.add_worktree_result.borrow_mut() = Some(Err(anyhow::anyhow!(message.to_string())));
    }

    pub fn fail_remove_worktree(&self, message: &str) {
        *self.remove_worktree_result.borrow_mut() =
            Some(Err(anyhow::anyhow!(message.to_string())));
    }
}

impl GitProvider for MockGitProvider {
    fn list_branches(&self, _repo_path: &Path) -> Vec<String> {
        self.branches.clone()
    }

    fn list_worktrees(&self, _repo_path: &Path) -> Result<Vec<Worktree>> {
        Ok(self.worktrees.clone())
    }

    fn add_worktree(&self, repo_path: &Path, worktree_path: &Path, branch: &str) -> Result<()> {
        let result = self.add_worktree_result.borrow_mut().take().unwrap_or(Ok(()));
        if result.is_ok() {
            self.added.borrow_mut().push((
                repo_path.to_path_buf(),
                worktree_path.to_path_buf(),
                branch.to_string(),
            ));
        }
        result
    }

    fn remove_worktree(&self, repo_path: &Path, worktree_path: &Path) -> Result<()> {
        let result = self
            .remove_worktree_result
            .borrow_mut()
            .take()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.removed
                .borrow_mut()
                .push((repo_path.to_path_buf(), worktree_path.to_path_buf()));
        }
        result
    }
}
