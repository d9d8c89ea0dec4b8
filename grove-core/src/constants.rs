pub const APP_NAME: &str = "grove";

/// Prefix shared by every tmux session grove creates (`g/<repo>/<branch>`, `g/<name>`).
pub const SESSION_NAMESPACE: &str = "g";

/// Managed worktrees live under `<repo>/.grove/worktrees/<branch>`.
pub const GROVE_DIR_NAME: &str = ".grove";
pub const WORKTREES_DIR_NAME: &str = "worktrees";
pub const GITIGNORE_ENTRY: &str = ".grove/";

pub const STATE_FILE_NAME: &str = "state.json";
pub const STATE_LOCK_FILE_NAME: &str = "state.lock";
pub const STATE_VERSION: u32 = 1;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PREFIX_KEY: &str = "C-s";
pub const DEFAULT_SIDEBAR_WIDTH: &str = "30%";
