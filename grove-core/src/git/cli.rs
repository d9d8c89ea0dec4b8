use super::{Worktree, parse_worktree_porcelain, provider::GitProvider};
use anyhow::{Context, Result};
use std::{
    fs,
    path::Path,
    process::{Command, Output},
};

pub struct CliGitProvider;

fn git(repo_path: &Path, args: &[&str]) -> Result<Output> {
    log::debug!("git {} (in {})", args.join(" "), repo_path.display());
    Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .context("failed to run git")
}

impl GitProvider for CliGitProvider {
    fn list_branches(&self, repo_path: &Path) -> Vec<String> {
        let Ok(output) = git(repo_path, &["branch", "--format=%(refname:short)"]) else {
            return Vec::new();
        };

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(String::from)
            .collect()
    }

    fn list_worktrees(&self, repo_path: &Path) -> Result<Vec<Worktree>> {
        let output = git(repo_path, &["worktree", "list", "--porcelain"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git worktree list failed: {}", stderr.trim());
        }
        Ok(parse_worktree_porcelain(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    fn add_worktree(&self, repo_path: &Path, worktree_path: &Path, branch: &str) -> Result<()> {
        if let Some(parent) = worktree_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let dest = worktree_path.to_string_lossy();

        let output = git(repo_path, &["worktree", "add", &dest, "-b", branch])?;
        if output.status.success() {
            return Ok(());
        }

        // The branch may already exist; check it out instead of creating it.
        let fallback = git(repo_path, &["worktree", "add", &dest, branch])?;
        if !fallback.status.success() {
            let stderr = String::from_utf8_lossy(&fallback.stderr);
            anyhow::bail!("git worktree add failed: {}", stderr.trim());
        }

        Ok(())
    }

    fn remove_worktree(&self, repo_path: &Path, worktree_path: &Path) -> Result<()> {
        let output = git(
            repo_path,
            &[
                "worktree",
                "remove",
                &worktree_path.to_string_lossy(),
                "--force",
            ],
        )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git worktree remove failed: {}", stderr.trim());
        }

        Ok(())
    }
}
