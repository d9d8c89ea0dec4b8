use super::provider::{PopupPosition, TmuxProvider};
use anyhow::{Context, Result};
use std::{path::Path, process::Command};

pub struct CliTmuxProvider;

/// Run tmux and return trimmed stdout, or an error carrying its output.
fn run(args: &[&str]) -> Result<String> {
    log::debug!("tmux {}", args.join(" "));
    let output = Command::new("tmux")
        .args(args)
        .output()
        .context("failed to run tmux")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("tmux {}: {}", args.join(" "), stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `display-popup` geometry for a sidebar docked to one edge.
fn popup_args(width: &str, position: PopupPosition) -> [String; 6] {
    let x = match position {
        PopupPosition::Left => "0".to_string(),
        PopupPosition::Right => "R".to_string(),
    };
    [
        "-x".to_string(),
        x,
        "-w".to_string(),
        width.to_string(),
        "-h".to_string(),
        "100%".to_string(),
    ]
}

impl TmuxProvider for CliTmuxProvider {
    fn list_sessions(&self) -> Vec<String> {
        match run(&["list-sessions", "-F", "#{session_name}"]) {
            Ok(out) => out.lines().map(String::from).collect(),
            Err(e) => {
                log::debug!("listing sessions: {e}");
                Vec::new()
            }
        }
    }

    fn session_exists(&self, name: &str) -> bool {
        // `=` forces an exact match instead of tmux's prefix matching.
        let target = format!("={name}");
        Command::new("tmux")
            .args(["has-session", "-t", &target])
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn create_session(&self, name: &str, dir: &Path) -> Result<()> {
        run(&["new-session", "-d", "-s", name, "-c", &dir.to_string_lossy()])?;
        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        run(&["kill-session", "-t", &format!("={name}")])?;
        Ok(())
    }

    fn rename_session(&self, from: &str, to: &str) -> Result<()> {
        run(&["rename-session", "-t", &format!("={from}"), to])?;
        Ok(())
    }

    fn switch_client(&self, name: &str) -> Result<()> {
        run(&["switch-client", "-t", &format!("={name}")])?;
        Ok(())
    }

    fn attach(&self, name: &str) -> Result<()> {
        let status = Command::new("tmux")
            .args(["attach-session", "-t", &format!("={name}")])
            .status()
            .context("failed to run tmux")?;
        if !status.success() {
            anyhow::bail!("tmux attach-session -t {name} exited with {status}");
        }
        Ok(())
    }

    fn current_session(&self) -> Option<String> {
        if !self.is_inside_tmux() {
            return None;
        }
        run(&["display-message", "-p", "#{session_name}"])
            .ok()
            .filter(|s| !s.is_empty())
    }

    fn is_inside_tmux(&self) -> bool {
        std::env::var("TMUX").is_ok_and(|v| !v.is_empty())
    }

    fn bind_popup(
        &self,
        key: &str,
        width: &str,
        position: PopupPosition,
        command: &str,
    ) -> Result<()> {
        let geometry = popup_args(width, position);
        let mut args = vec!["bind-key", key, "display-popup", "-E"];
        args.extend(geometry.iter().map(String::as_str));
        args.push(command);
        run(&args)?;
        Ok(())
    }
}
