mod actions;

use crate::{
    components::{self, input::InputStyle},
    keymap,
    theme::Theme,
};
use actions::{
    handle_activate, handle_cancel, handle_confirm, handle_delete, handle_input, handle_new,
    handle_reload, handle_rename, handle_start_filter, handle_toggle_expand,
};
use crossterm::event::{self, Event, KeyEventKind};
use grove_core::{
    action::Action,
    config::KeysConfig,
    names::NameGenerator,
    sidebar::{Mode, SidebarState},
    store::StateStore,
    visibility::Direction,
    workflow::Workflows,
};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout},
};

/// What to do after the sidebar exits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAction {
    Switch { session_name: String },
    Quit,
}

/// Everything the sidebar needs besides its own state.
pub struct Context<'a> {
    pub store: &'a StateStore,
    pub workflows: Workflows<'a>,
    pub keys: &'a KeysConfig,
    pub theme: &'a Theme,
    pub names: NameGenerator,
}

/// Run the sidebar until the user quits or picks a workspace.
///
/// The loop blocks on terminal input; the state lock is only taken inside
/// individual actions.
pub fn run(
    terminal: &mut DefaultTerminal,
    state: &mut SidebarState,
    ctx: &mut Context<'_>,
) -> anyhow::Result<OpenAction> {
    loop {
        terminal.draw(|f| draw(f, state, ctx.theme, ctx.keys))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Clear error on any keypress
        state.error = None;

        if let Some(action) = keymap::resolve_action(key, state, ctx.keys)
            && let Some(result) = process_action(action, state, ctx)?
        {
            return Ok(result);
        }
    }
}

/// Title and placeholder of the text input shown in `mode`.
fn input_labels(mode: &Mode) -> Option<(String, &'static str)> {
    let (title, placeholder) = match mode {
        Mode::Create(form) => (form.title(), form.placeholder()),
        Mode::Filter(_) => ("Filter".to_string(), "type to filter"),
        Mode::Rename { .. } => ("Rename".to_string(), "new name"),
        Mode::Browse | Mode::Delete { .. } => return None,
    };
    Some((title, placeholder))
}

fn draw(f: &mut Frame, state: &SidebarState, theme: &Theme, keys: &KeysConfig) {
    let preview = components::tree_view::preview(state);
    let input = state.mode.input();
    let form_error = match &state.mode {
        Mode::Create(form) => form.error.as_deref(),
        _ => None,
    };
    let error = state.error.as_deref();

    let chunks = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(u16::from(preview.is_some())),
        Constraint::Length(if input.is_some() { 3 } else { 0 }),
        Constraint::Length(u16::from(error.is_some())),
        Constraint::Length(1),
    ])
    .split(f.area());

    components::tree_view::draw(f, chunks[0], state, theme);

    if let Some(message) = preview {
        components::tree_view::draw_preview(f, chunks[1], message, theme);
    }

    if let (Some(input), Some((title, placeholder))) = (input, input_labels(&state.mode)) {
        let style = InputStyle {
            title: &title,
            placeholder,
            error: form_error,
            border_color: theme.accent,
            muted_color: theme.muted,
            error_color: theme.error,
        };
        components::input::draw(f, chunks[2], &style, input);
    }

    if let Some(error) = error {
        components::error_bar::draw(f, chunks[3], error, theme);
    }

    components::footer::draw(f, chunks[4], &state.mode, keys, theme);
    components::confirm::draw(f, chunks[0], &state.mode, theme, keys);
}

/// Apply one action. Persistence failures are returned; workflow failures
/// end up in `state.error` or the create form.
fn process_action(
    action: Action,
    state: &mut SidebarState,
    ctx: &mut Context<'_>,
) -> anyhow::Result<Option<OpenAction>> {
    match action {
        Action::Quit => return Ok(Some(OpenAction::Quit)),

        Action::MoveUp => state.move_cursor(Direction::Up),
        Action::MoveDown => state.move_cursor(Direction::Down),
        Action::MoveTop => state.move_to_top(),
        Action::MoveBottom => state.move_to_bottom(),

        Action::Activate => return handle_activate(state, ctx),
        Action::ToggleExpand => handle_toggle_expand(state, ctx)?,
        Action::NewWorkspace => handle_new(state),
        Action::DeleteWorkspace => handle_delete(state),
        Action::RenameWorkspace => handle_rename(state),
        Action::StartFilter => handle_start_filter(state),
        Action::Reload => handle_reload(state, ctx)?,

        Action::InputPush(_)
        | Action::InputBackspace
        | Action::InputDeleteWord
        | Action::CursorLeft
        | Action::CursorRight
        | Action::CursorStart
        | Action::CursorEnd => handle_input(state, &action),

        Action::Confirm => handle_confirm(state, ctx)?,
        Action::Cancel => handle_cancel(state),
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::{
        config::{Config, ThemeConfig, load_config_from_str},
        git::{self, mock::MockGitProvider},
        sidebar::{CreateForm, TextInput},
        store::{State, Workspace},
        tmux::mock::MockTmuxProvider,
    };
    use ratatui::{Terminal, backend::TestBackend};
    use std::{fs, path::PathBuf};
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        tmp: TempDir,
        repo_path: PathBuf,
        config: Config,
        store: StateStore,
        git: MockGitProvider,
        tmux: MockTmuxProvider,
        theme: Theme,
    }

    fn fixture() -> Fixture {
        let tmp = tempdir().unwrap();
        let repo_path = tmp.path().join("api");
        fs::create_dir_all(&repo_path).unwrap();
        let config = load_config_from_str(&format!(
            "[[repos]]\npath = \"{}\"\ndefault_branch = \"main\"\n",
            repo_path.display()
        ))
        .unwrap();
        let store = StateStore::new(tmp.path().join("state"));
        Fixture {
            tmp,
            repo_path,
            config,
            store,
            git: MockGitProvider::default(),
            tmux: MockTmuxProvider::default(),
            theme: Theme::from_config(&ThemeConfig::default()),
        }
    }

    impl Fixture {
        fn context(&self) -> Context<'_> {
            Context {
                store: &self.store,
                workflows: Workflows::new(&self.config, &self.git, &self.tmux)
                    .with_default_dir(self.tmp.path().to_path_buf()),
                keys: &self.config.keys,
                theme: &self.theme,
                names: NameGenerator::seeded(7),
            }
        }

        fn worktree(&self, branch: &str) -> Workspace {
            let path = if branch == "main" {
                self.repo_path.clone()
            } else {
                git::managed_worktree_path(&self.repo_path, branch)
            };
            fs::create_dir_all(&path).unwrap();
            Workspace::worktree("api", self.repo_path.clone(), path, branch)
        }

        fn seed(&self, workspaces: Vec<Workspace>) -> SidebarState {
            let (doc, outcome) = self
                .store
                .update(|doc| {
                    for ws in workspaces {
                        doc.add_workspace(ws)?;
                    }
                    Ok::<_, grove_core::store::DuplicateSession>(())
                })
                .unwrap();
            outcome.unwrap();
            SidebarState::new(doc, self.config.repo_order(), None)
        }

        fn sessions_on_disk(&self) -> Vec<String> {
            self.store
                .load()
                .unwrap()
                .workspaces
                .into_iter()
                .map(|ws| ws.session_name)
                .collect()
        }
    }

    fn type_text(state: &mut SidebarState, ctx: &mut Context<'_>, text: &str) {
        for c in text.chars() {
            process_action(Action::InputPush(c), state, ctx).unwrap();
        }
    }

    #[test]
    fn activate_workspace_persists_and_switches() {
        let fx = fixture();
        let mut ws = fx.worktree("main");
        ws.notification = Some("build done".into());
        let mut state = fx.seed(vec![ws]);
        let mut ctx = fx.context();

        state.focus_session("g/api/main");
        let result = process_action(Action::Activate, &mut state, &mut ctx).unwrap();

        assert_eq!(
            result,
            Some(OpenAction::Switch {
                session_name: "g/api/main".into()
            })
        );
        let doc = fx.store.load().unwrap();
        assert_eq!(doc.last_active.as_deref(), Some("g/api/main"));
        assert_eq!(doc.workspaces[0].notification, None);
        // The session was missing, so it was recreated in the repo root.
        assert_eq!(
            fx.tmux.created.borrow().as_slice(),
            &[("g/api/main".to_string(), fx.repo_path.clone())]
        );
    }

    #[test]
    fn activate_repo_toggles_persisted_collapse() {
        let fx = fixture();
        let mut state = fx.seed(vec![fx.worktree("main")]);
        let mut ctx = fx.context();
        state.move_to_top();

        let result = process_action(Action::Activate, &mut state, &mut ctx).unwrap();
        assert_eq!(result, None);
        assert!(fx.store.load().unwrap().collapsed.contains("api"));
        assert_eq!(state.visible().len(), 1);

        process_action(Action::ToggleExpand, &mut state, &mut ctx).unwrap();
        assert!(fx.store.load().unwrap().collapsed.is_empty());
        assert_eq!(state.visible().len(), 2);
    }

    #[test]
    fn create_plain_from_sidebar_lands_cursor_on_new_workspace() {
        let fx = fixture();
        let mut state = fx.seed(Vec::new());
        let mut ctx = fx.context();

        process_action(Action::NewWorkspace, &mut state, &mut ctx).unwrap();
        assert_eq!(state.mode, Mode::Create(CreateForm::plain()));
        type_text(&mut state, &mut ctx, "notes");
        process_action(Action::Confirm, &mut state, &mut ctx).unwrap();

        assert_eq!(state.mode, Mode::Browse);
        assert_eq!(fx.sessions_on_disk(), vec!["g/notes".to_string()]);
        assert_eq!(
            state.selected_workspace().map(|ws| ws.session_name.as_str()),
            Some("g/notes")
        );
    }

    #[test]
    fn create_duplicate_keeps_form_open_with_error() {
        let fx = fixture();
        let mut state = fx.seed(vec![fx.worktree("main")]);
        let mut ctx = fx.context();
        state.focus_session("g/api/main");

        process_action(Action::NewWorkspace, &mut state, &mut ctx).unwrap();
        assert!(matches!(&state.mode, Mode::Create(form) if form.input.is_empty()));
        type_text(&mut state, &mut ctx, "main");
        process_action(Action::Confirm, &mut state, &mut ctx).unwrap();

        let Mode::Create(form) = &state.mode else {
            panic!("expected create mode, got {:?}", state.mode);
        };
        assert!(form.error.as_deref().unwrap().contains("already exists"));
        assert_eq!(form.input.value(), "main");
        assert!(fx.tmux.created.borrow().is_empty());
        assert_eq!(fx.sessions_on_disk(), vec!["g/api/main".to_string()]);

        // Editing the input clears the stale error.
        process_action(Action::InputBackspace, &mut state, &mut ctx).unwrap();
        assert!(matches!(&state.mode, Mode::Create(form) if form.error.is_none()));
    }

    #[test]
    fn delete_confirm_removes_record_and_worktree() {
        let fx = fixture();
        let mut state = fx.seed(vec![fx.worktree("main"), fx.worktree("feat-x")]);
        fx.tmux.sessions.borrow_mut().push("g/api/feat-x".into());
        let mut ctx = fx.context();
        state.focus_session("g/api/feat-x");

        process_action(Action::DeleteWorkspace, &mut state, &mut ctx).unwrap();
        assert!(matches!(&state.mode, Mode::Delete { label, .. } if label == "feat-x"));
        process_action(Action::Confirm, &mut state, &mut ctx).unwrap();

        assert_eq!(state.mode, Mode::Browse);
        assert_eq!(fx.sessions_on_disk(), vec!["g/api/main".to_string()]);
        assert_eq!(
            fx.tmux.killed_sessions.borrow().as_slice(),
            &["g/api/feat-x".to_string()]
        );
        assert_eq!(fx.git.removed.borrow().len(), 1);
        assert!(state.cursor.is_some());
    }

    #[test]
    fn delete_on_repo_header_is_ignored() {
        let fx = fixture();
        let mut state = fx.seed(vec![fx.worktree("main")]);
        let mut ctx = fx.context();
        state.move_to_top();

        process_action(Action::DeleteWorkspace, &mut state, &mut ctx).unwrap();
        assert_eq!(state.mode, Mode::Browse);
    }

    #[test]
    fn delete_cancel_keeps_everything() {
        let fx = fixture();
        let mut state = fx.seed(vec![fx.worktree("feat-x")]);
        let mut ctx = fx.context();
        state.focus_session("g/api/feat-x");

        process_action(Action::DeleteWorkspace, &mut state, &mut ctx).unwrap();
        process_action(Action::Cancel, &mut state, &mut ctx).unwrap();
        assert_eq!(state.mode, Mode::Browse);
        assert_eq!(fx.sessions_on_disk(), vec!["g/api/feat-x".to_string()]);
        assert!(fx.tmux.killed_sessions.borrow().is_empty());
    }

    #[test]
    fn rename_prefills_and_updates_session() {
        let fx = fixture();
        let mut state = fx.seed(vec![fx.worktree("main")]);
        fx.tmux.sessions.borrow_mut().push("g/api/main".into());
        let mut ctx = fx.context();
        state.focus_session("g/api/main");

        process_action(Action::RenameWorkspace, &mut state, &mut ctx).unwrap();
        assert!(matches!(&state.mode, Mode::Rename { input, .. } if input.value() == "main"));
        process_action(Action::InputDeleteWord, &mut state, &mut ctx).unwrap();
        type_text(&mut state, &mut ctx, "feature");
        process_action(Action::Confirm, &mut state, &mut ctx).unwrap();

        assert_eq!(state.mode, Mode::Browse);
        assert_eq!(fx.sessions_on_disk(), vec!["g/api/feature".to_string()]);
        assert_eq!(
            state.selected_workspace().map(|ws| ws.label()),
            Some("feature")
        );
    }

    #[test]
    fn rename_failure_reports_and_returns_to_browse() {
        let fx = fixture();
        let mut state = fx.seed(vec![fx.worktree("main"), fx.worktree("dev")]);
        let mut ctx = fx.context();
        state.focus_session("g/api/dev");

        process_action(Action::RenameWorkspace, &mut state, &mut ctx).unwrap();
        process_action(Action::InputDeleteWord, &mut state, &mut ctx).unwrap();
        type_text(&mut state, &mut ctx, "main");
        process_action(Action::Confirm, &mut state, &mut ctx).unwrap();

        assert_eq!(state.mode, Mode::Browse);
        assert!(state.error.as_deref().unwrap().contains("already exists"));
        assert_eq!(
            fx.sessions_on_disk(),
            vec!["g/api/main".to_string(), "g/api/dev".to_string()]
        );
    }

    #[test]
    fn filter_applies_live_and_cancel_clears() {
        let fx = fixture();
        let mut state = fx.seed(vec![
            fx.worktree("main"),
            fx.worktree("feat-x"),
            Workspace::plain("notes", fx.tmp.path().to_path_buf()),
        ]);
        let mut ctx = fx.context();

        process_action(Action::StartFilter, &mut state, &mut ctx).unwrap();
        type_text(&mut state, &mut ctx, "feat");
        assert_eq!(state.visible().len(), 2);

        process_action(Action::Confirm, &mut state, &mut ctx).unwrap();
        assert_eq!(state.mode, Mode::Browse);
        assert_eq!(state.filter, "feat");
        assert_eq!(state.visible().len(), 2);

        process_action(Action::StartFilter, &mut state, &mut ctx).unwrap();
        assert_eq!(state.mode, Mode::Filter(TextInput::with_text("feat")));
        process_action(Action::Cancel, &mut state, &mut ctx).unwrap();
        assert_eq!(state.filter, "");
        assert_eq!(state.visible().len(), 4);
    }

    #[test]
    fn filter_with_trailing_space_matches_what_gets_committed() {
        let fx = fixture();
        let mut state = fx.seed(vec![fx.worktree("main"), fx.worktree("feat-x")]);
        let mut ctx = fx.context();

        process_action(Action::StartFilter, &mut state, &mut ctx).unwrap();
        type_text(&mut state, &mut ctx, "main ");
        let live = state.visible();
        assert_eq!(live.len(), 2);

        process_action(Action::Confirm, &mut state, &mut ctx).unwrap();
        assert_eq!(state.filter, "main");
        assert_eq!(state.visible(), live);
    }

    #[test]
    fn reload_picks_up_external_changes() {
        let fx = fixture();
        let mut state = fx.seed(Vec::new());
        let mut ctx = fx.context();

        let mut doc = State::default();
        doc.add_workspace(Workspace::plain("scratch", fx.tmp.path().to_path_buf()))
            .unwrap();
        fx.store.save(&doc).unwrap();

        process_action(Action::Reload, &mut state, &mut ctx).unwrap();
        assert_eq!(state.visible().len(), 1);
        assert!(state.cursor.is_some());
    }

    #[test]
    fn quit_returns_quit() {
        let fx = fixture();
        let mut state = fx.seed(Vec::new());
        let mut ctx = fx.context();
        assert_eq!(
            process_action(Action::Quit, &mut state, &mut ctx).unwrap(),
            Some(OpenAction::Quit)
        );
    }

    #[test]
    fn draw_shows_input_error_and_footer() {
        let fx = fixture();
        let mut state = fx.seed(vec![fx.worktree("main")]);
        let mut form = CreateForm::worktree("api");
        form.error = Some("boom".into());
        state.mode = Mode::Create(form);

        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        terminal
            .draw(|f| draw(f, &state, &fx.theme, &fx.config.keys))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let screen: String = buffer
            .content()
            .chunks(usize::from(buffer.area.width))
            .map(|cells| cells.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");

        assert!(screen.contains("New worktree in api"), "{screen}");
        assert!(screen.contains("boom"), "{screen}");
        assert!(screen.contains("enter confirm"), "{screen}");
    }
}
