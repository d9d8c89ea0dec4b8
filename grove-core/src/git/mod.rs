pub mod cli;
pub mod mock;
pub mod provider;

pub use cli::CliGitProvider;
pub use provider::GitProvider;

use crate::constants::{GITIGNORE_ENTRY, GROVE_DIR_NAME, WORKTREES_DIR_NAME};
use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    pub head: Option<String>,
    pub branch: Option<String>,
    pub bare: bool,
}

/// Where grove checks out `branch` for the repo at `repo_path`.
pub fn managed_worktree_path(repo_path: &Path, branch: &str) -> PathBuf {
    repo_path
        .join(GROVE_DIR_NAME)
        .join(WORKTREES_DIR_NAME)
        .join(branch)
}

/// Make sure the repo's `.gitignore` excludes the managed worktree directory.
/// Returns true when the file was changed.
pub fn ensure_gitignore(repo_path: &Path) -> Result<bool> {
    let path = repo_path.join(".gitignore");
    let existing = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let bare_entry = GITIGNORE_ENTRY.trim_end_matches('/');
    if existing
        .lines()
        .map(str::trim)
        .any(|line| line == GITIGNORE_ENTRY || line == bare_entry || line == "/.grove/")
    {
        return Ok(false);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    let separator = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    writeln!(file, "{separator}{GITIGNORE_ENTRY}")
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(true)
}

/// Parse `git worktree list --porcelain` output into worktrees
pub fn parse_worktree_porcelain(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;

    for line in output.lines() {
        if let Some(p) = line.strip_prefix("worktree ") {
            worktrees.extend(current.take());
            current = Some(Worktree {
                path: PathBuf::from(p),
                head: None,
                branch: None,
                bare: false,
            });
        } else if let Some(wt) = current.as_mut() {
            if let Some(h) = line.strip_prefix("HEAD ") {
                wt.head = Some(h.to_string());
            } else if let Some(b) = line.strip_prefix("branch ") {
                wt.branch = Some(b.strip_prefix("refs/heads/").unwrap_or(b).to_string());
            } else if line == "bare" {
                wt.bare = true;
            } else if line.is_empty() {
                worktrees.extend(current.take());
            }
        }
    }

    worktrees.extend(current);
    worktrees
}
