use super::Worktree;
use anyhow::Result;
use std::path::Path;

pub trait GitProvider {
    fn list_branches(&self, repo_path: &Path) -> Vec<String>;
    fn list_worktrees(&self, repo_path: &Path) -> Result<Vec<Worktree>>;
    /// Create `worktree_path` on a new branch, or on `branch` if it already exists.
    fn add_worktree(&self, repo_path: &Path, worktree_path: &Path, branch: &str) -> Result<()>;
    fn remove_worktree(&self, repo_path: &Path, worktree_path: &Path) -> Result<()>;
}
