use crate::constants::{APP_NAME, CONFIG_FILE_NAME};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Expand a leading `~` to the user's home directory.
///
/// Returns `None` when the path starts with `~` but the home directory
/// cannot be determined. Non-tilde paths are returned as-is.
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    if path == "~" {
        dirs::home_dir()
    } else if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir().map(|home| home.join(rest))
    } else {
        Some(PathBuf::from(path))
    }
}

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("unable to determine home directory")
}

fn xdg_dir(var: &str, fallback: &[&str]) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(var)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }
    let mut path = home_dir()?;
    for segment in fallback {
        path.push(segment);
    }
    Ok(path.join(APP_NAME))
}

/// `$XDG_STATE_HOME/grove`, falling back to `~/.local/state/grove`.
pub fn state_dir() -> Result<PathBuf> {
    xdg_dir("XDG_STATE_HOME", &[".local", "state"])
}

/// `$XDG_CONFIG_HOME/grove`, falling back to `~/.config/grove`.
pub fn config_dir() -> Result<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", &[".config"])
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// `$XDG_CACHE_HOME/grove`, falling back to `~/.cache/grove`.
pub fn cache_dir() -> Result<PathBuf> {
    xdg_dir("XDG_CACHE_HOME", &[".cache"])
}

/// Last path component as a string, used for default repo names.
pub fn basename(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
