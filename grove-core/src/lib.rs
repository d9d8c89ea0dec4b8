pub mod action;
pub mod config;
pub mod constants;
pub mod git;
pub mod keyboard;
pub mod names;
pub mod paths;
pub mod sidebar;
pub mod store;
pub mod tmux;
pub mod tree;
pub mod visibility;
pub mod workflow;

// Re-export commonly used types at crate root
pub use action::Action;
pub use config::Config;
pub use git::{GitProvider, Worktree};
pub use keyboard::KeyEvent;
pub use sidebar::{Mode, SidebarState};
pub use store::{State, StateStore, Workspace, WorkspaceKind};
pub use tmux::TmuxProvider;
pub use workflow::{Cleanup, CreateRequest, WorkflowError, Workflows};
