use super::provider::{PopupPosition, TmuxProvider};
use anyhow::Result;
use std::{
    cell::RefCell,
    path::{Path, PathBuf},
};

/// In-memory tmux for tests. `sessions` is the live session list and is
/// updated by create/kill/rename so lookups stay consistent within a test.
#[derive(Default)]
pub struct MockTmuxProvider {
    pub sessions: RefCell<Vec<String>>,
    pub inside_tmux: bool,
    pub current: Option<String>,
    pub create_result: RefCell<Option<Result<()>>>,
    pub rename_result: RefCell<Option<Result<()>>>,
    pub kill_result: RefCell<Option<Result<()>>>,
    pub created: RefCell<Vec<(String, PathBuf)>>,
    pub killed_sessions: RefCell<Vec<String>>,
    pub renamed: RefCell<Vec<(String, String)>>,
    pub switched: RefCell<Vec<String>>,
    pub attached: RefCell<Vec<String>>,
    pub bindings: RefCell<Vec<String>>,
}

impl MockTmuxProvider {
    pub fn with_sessions(sessions: &[&str]) -> Self {
        Self {
            sessions: RefCell::new(sessions.iter().map(ToString::to_string).collect()),
            ..Self::default()
        }
    }

    pub fn fail_create(&self, message: &str) {
        *self.create_result.borrow_mut() = Some(Err(anyhow::anyhow!(message.to_string())));
    }

    pub fn fail_rename(&self, message: &str) {
        *self.rename_result.borrow_mut() = Some(Err(anyhow::anyhow!(message.to_string())));
    }

    pub fn fail_kill(&self, message: &str) {
        *self.kill_result.borrow_mut() = Some(Err(anyhow::anyhow!(message.to_string())));
    }
}

impl TmuxProvider for MockTmuxProvider {
    fn list_sessions(&self) -> Vec<String> {
        self.sessions.borrow().clone()
    }

    fn session_exists(&self, name: &str) -> bool {
        self.sessions.borrow().iter().any(|s| s == name)
    }

    fn create_session(&self, name: &str, dir: &Path) -> Result<()> {
        self.create_result.borrow_mut().take().unwrap_or(Ok(()))?;
        self.sessions.borrow_mut().push(name.to_string());
        self.created
            .borrow_mut()
            .push((name.to_string(), dir.to_path_buf()));
        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        self.kill_result.borrow_mut().take().unwrap_or(Ok(()))?;
        self.sessions.borrow_mut().retain(|s| s != name);
        self.killed_sessions.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn rename_session(&self, from: &str, to: &str) -> Result<()> {
        self.rename_result.borrow_mut().take().unwrap_or(Ok(()))?;
        for session in self.sessions.borrow_mut().iter_mut() {
            if session == from {
                *session = to.to_string();
            }
        }
        self.renamed
            .borrow_mut()
            .push((from.to_string(), to.to_string()));
        Ok(())
    }

    fn switch_client(&self, name: &str) -> Result<()> {
        self.switched.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn attach(&self, name: &str) -> Result<()> {
        self.attached.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn current_session(&self) -> Option<String> {
        self.current.clone()
    }

    fn is_inside_tmux(&self) -> bool {
        self.inside_tmux
    }

    fn bind_popup(
        &self,
        key: &str,
        _width: &str,
        _position: PopupPosition,
        command: &str,
    ) -> Result<()> {
        self.bindings.borrow_mut().push(format!("{key} {command}"));
        Ok(())
    }
}
