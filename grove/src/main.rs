mod cli;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{CliError, CliResult, NewArgs, NotifyArgs};
use grove_core::{
    config::{self, Config},
    git::{CliGitProvider, GitProvider},
    names::NameGenerator,
    sidebar::SidebarState,
    store::StateStore,
    tmux::{CliTmuxProvider, TmuxProvider},
    workflow::Workflows,
};
use grove_tui::{Context, OpenAction, Theme};
use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    process::ExitCode,
};

#[derive(Parser)]
#[command(version, about = "Tmux workspaces backed by git worktrees")]
struct Cli {
    /// Override path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore configured workspaces and attach to the last one
    Start,
    /// Create a worktree workspace, or a plain one with --plain
    New {
        /// Repo name, or the workspace name with --plain
        target: Option<String>,
        /// Branch to check out (generated when omitted)
        branch: Option<String>,
        /// Create a plain workspace instead of a worktree
        #[arg(long)]
        plain: bool,
        /// Directory for a plain workspace (default: home)
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        no_switch: bool,
    },
    /// Delete a workspace, its session and its managed worktree
    Rm {
        workspace: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Switch to a workspace, recreating its session if needed
    Switch { workspace: String },
    /// List workspaces
    List {
        #[arg(long)]
        json: bool,
    },
    /// Set (or `clear`) the notification badge of a workspace
    Notify {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
        /// Target session (default: the current tmux session)
        #[arg(long)]
        session: Option<String>,
    },
    /// Open the sidebar (runs inside a tmux popup)
    Sidebar,
    /// Edit the config file
    Config {
        /// Print the config path instead of opening an editor
        #[arg(long)]
        path: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::setup_logging(logging::level_from_env()) {
        eprintln!("warning: logging disabled: {e:#}");
    }
    let json_errors = matches!(cli.command, Commands::List { json: true });

    match run(cli) {
        Ok(()) => ExitCode::from(0),
        Err(error) => {
            log::error!("{error}");
            cli::print_error(&error, json_errors);
            let code: u8 = match error.code() {
                1 => 1,
                _ => 2,
            };
            ExitCode::from(code)
        }
    }
}

fn load_config(config_override: Option<&Path>) -> CliResult<Config> {
    config::load_config(config_override).map_err(|e| CliError::system(format!("{e:#}")))
}

fn run(cli: Cli) -> CliResult<()> {
    let config_override = cli.config.as_deref();
    let git = CliGitProvider;
    let tmux = CliTmuxProvider;

    match cli.command {
        Commands::Config { path } => {
            let path_buf = config::config_path(config_override)?;
            cli::cmd_config(&path_buf, path)
        }
        Commands::Sidebar => run_sidebar(config_override, &git, &tmux),
        Commands::List { json } => {
            let store = StateStore::open_default()?;
            cli::cmd_list(&store, &tmux, json)
        }
        Commands::Notify { message, session } => {
            let store = StateStore::open_default()?;
            cli::cmd_notify(&store, &tmux, &NotifyArgs { message, session })
        }
        Commands::Start => {
            let sidebar = sidebar_command(config_override)?;
            with_workflows(config_override, &git, &tmux, |config, store, workflows| {
                cli::cmd_start(config, store, workflows, &sidebar)
            })
        }
        Commands::New {
            target,
            branch,
            plain,
            path,
            no_switch,
        } => {
            let args = NewArgs {
                target,
                branch,
                plain,
                path,
                no_switch,
            };
            with_workflows(config_override, &git, &tmux, |config, store, workflows| {
                cli::cmd_new(config, store, workflows, &args)
            })
        }
        Commands::Rm { workspace, force } => {
            with_workflows(config_override, &git, &tmux, |_, store, workflows| {
                cli::cmd_rm(store, workflows, &workspace, force)
            })
        }
        Commands::Switch { workspace } => {
            with_workflows(config_override, &git, &tmux, |_, store, workflows| {
                cli::cmd_switch(store, workflows, &workspace)
            })
        }
    }
}

/// Load the validated config and the store, then run `f` with the workflows bound to them.
fn with_workflows(
    config_override: Option<&Path>,
    git: &dyn GitProvider,
    tmux: &dyn TmuxProvider,
    f: impl FnOnce(&Config, &StateStore, &Workflows<'_>) -> CliResult<()>,
) -> CliResult<()> {
    let config = load_config(config_override)?;
    let store = StateStore::open_default()?;
    let workflows = Workflows::new(&config, git, tmux);
    f(&config, &store, &workflows)
}

/// Shell command the popup key runs: this binary's `sidebar`, with the same config.
fn sidebar_command(config_override: Option<&Path>) -> Result<String> {
    let exe = std::env::current_exe()?;
    let exe = dunce::canonicalize(&exe).unwrap_or(exe);
    let mut command = format!("'{}' sidebar", exe.display());
    if let Some(path) = config_override {
        let path = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let _ = write!(command, " --config '{}'", path.display());
    }
    Ok(command)
}

fn run_sidebar(
    config_override: Option<&Path>,
    git: &dyn GitProvider,
    tmux: &dyn TmuxProvider,
) -> CliResult<()> {
    if !tmux.is_inside_tmux() {
        return Err(CliError::user("grove sidebar must run inside tmux"));
    }
    let config = config::load_config_fast(config_override)?;
    let store = StateStore::open_default()?;
    let doc = store.load()?;
    let mut state = SidebarState::new(doc, config.repo_order(), tmux.current_session());

    let theme = Theme::from_config(&config.theme);
    let mut ctx = Context {
        store: &store,
        workflows: Workflows::new(&config, git, tmux),
        keys: &config.keys,
        theme: &theme,
        names: NameGenerator::from_entropy(),
    };

    let mut terminal = ratatui::init();
    let result = grove_tui::run(&mut terminal, &mut state, &mut ctx);
    ratatui::restore();

    match result? {
        OpenAction::Switch { session_name } => tmux.switch_client(&session_name)?,
        OpenAction::Quit => {}
    }
    Ok(())
}
