use anyhow::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupPosition {
    #[default]
    Left,
    Right,
}

pub trait TmuxProvider {
    fn list_sessions(&self) -> Vec<String>;
    fn session_exists(&self, name: &str) -> bool;
    fn create_session(&self, name: &str, dir: &Path) -> Result<()>;
    fn kill_session(&self, name: &str) -> Result<()>;
    fn rename_session(&self, from: &str, to: &str) -> Result<()>;
    fn switch_client(&self, name: &str) -> Result<()>;
    /// Attach the current terminal; blocks until the client detaches.
    fn attach(&self, name: &str) -> Result<()>;
    fn current_session(&self) -> Option<String>;
    fn is_inside_tmux(&self) -> bool;
    /// Bind `prefix <key>` to a popup running `command`.
    fn bind_popup(&self, key: &str, width: &str, position: PopupPosition, command: &str)
    -> Result<()>;

    /// Switch when running inside tmux, attach otherwise.
    fn switch_or_attach(&self, name: &str) -> Result<()> {
        if self.is_inside_tmux() {
            self.switch_client(name)
        } else {
            self.attach(name)
        }
    }
}
