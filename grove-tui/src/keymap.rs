use crossterm::event::KeyEvent as CrosstermKeyEvent;
use grove_core::{
    action::Action,
    config::{KeysConfig, keys::Command},
    keyboard::{KeyCode, KeyEvent, KeyModifiers},
    sidebar::SidebarState,
};

/// Resolve a key event into an Action based on the current mode.
///
/// Bound keys win; in text modes any other printable character is typed
/// into the active input.
pub fn resolve_action(
    key: CrosstermKeyEvent,
    state: &SidebarState,
    keys: &KeysConfig,
) -> Option<Action> {
    let key = KeyEvent::from(key);
    let keymap = keys.keymap_for_mode(&state.mode);

    if let Some(command) = keymap.get(&key) {
        return command_to_action(command);
    }

    if state.mode.input().is_some()
        && let KeyCode::Char(c) = key.code
        && !c.is_control()
        && !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return Some(Action::InputPush(c));
    }

    None
}

fn command_to_action(command: &Command) -> Option<Action> {
    let action = match command {
        Command::Noop => return None,
        Command::Quit => Action::Quit,
        Command::MoveUp => Action::MoveUp,
        Command::MoveDown => Action::MoveDown,
        Command::MoveTop => Action::MoveTop,
        Command::MoveBottom => Action::MoveBottom,
        Command::Activate => Action::Activate,
        Command::ToggleExpand => Action::ToggleExpand,
        Command::NewWorkspace => Action::NewWorkspace,
        Command::DeleteWorkspace => Action::DeleteWorkspace,
        Command::RenameWorkspace => Action::RenameWorkspace,
        Command::StartFilter => Action::StartFilter,
        Command::Reload => Action::Reload,
        Command::DeleteBackwardChar => Action::InputBackspace,
        Command::DeleteBackwardWord => Action::InputDeleteWord,
        Command::MoveCursorLeft => Action::CursorLeft,
        Command::MoveCursorRight => Action::CursorRight,
        Command::MoveCursorStart => Action::CursorStart,
        Command::MoveCursorEnd => Action::CursorEnd,
        Command::Confirm => Action::Confirm,
        Command::Cancel => Action::Cancel,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode as CtCode, KeyModifiers as CtMods};
    use grove_core::{
        sidebar::{CreateForm, Mode, TextInput},
        store::State,
    };

    fn key(code: CtCode) -> CrosstermKeyEvent {
        CrosstermKeyEvent::new(code, CtMods::NONE)
    }

    fn sidebar(mode: Mode) -> SidebarState {
        let mut state = SidebarState::new(State::default(), Vec::new(), None);
        state.mode = mode;
        state
    }

    #[test]
    fn browse_keys_map_to_commands() {
        let keys = KeysConfig::default();
        let state = sidebar(Mode::Browse);
        assert_eq!(
            resolve_action(key(CtCode::Char('j')), &state, &keys),
            Some(Action::MoveDown)
        );
        assert_eq!(
            resolve_action(key(CtCode::Char('c')), &state, &keys),
            Some(Action::NewWorkspace)
        );
        assert_eq!(
            resolve_action(key(CtCode::Enter), &state, &keys),
            Some(Action::Activate)
        );
        // Unbound letters do nothing while browsing.
        assert_eq!(resolve_action(key(CtCode::Char('z')), &state, &keys), None);
    }

    #[test]
    fn text_modes_type_characters() {
        let keys = KeysConfig::default();
        let state = sidebar(Mode::Create(CreateForm::plain()));
        assert_eq!(
            resolve_action(key(CtCode::Char('j')), &state, &keys),
            Some(Action::InputPush('j'))
        );
        assert_eq!(
            resolve_action(key(CtCode::Backspace), &state, &keys),
            Some(Action::InputBackspace)
        );
        assert_eq!(
            resolve_action(key(CtCode::Esc), &state, &keys),
            Some(Action::Cancel)
        );
        assert_eq!(
            resolve_action(
                CrosstermKeyEvent::new(CtCode::Char('w'), CtMods::CONTROL),
                &state,
                &keys
            ),
            Some(Action::InputDeleteWord)
        );
    }

    #[test]
    fn keys_without_a_character_are_not_typed() {
        let keys = KeysConfig::default();
        let state = sidebar(Mode::Filter(TextInput::default()));
        for code in [CtCode::F(1), CtCode::F(12), CtCode::Insert, CtCode::CapsLock] {
            assert_eq!(resolve_action(key(code), &state, &keys), None, "{code:?}");
        }
        assert_eq!(resolve_action(key(CtCode::Char('\0')), &state, &keys), None);
        assert_eq!(resolve_action(key(CtCode::Char('\u{1b}')), &state, &keys), None);
    }

    #[test]
    fn ctrl_c_quits_everywhere() {
        let keys = KeysConfig::default();
        let ctrl_c = CrosstermKeyEvent::new(CtCode::Char('c'), CtMods::CONTROL);
        for mode in [
            Mode::Browse,
            Mode::Filter(TextInput::default()),
            Mode::Delete {
                session_name: "g/x".into(),
                label: "x".into(),
            },
        ] {
            assert_eq!(
                resolve_action(ctrl_c, &sidebar(mode), &keys),
                Some(Action::Quit)
            );
        }
    }

    #[test]
    fn delete_mode_only_answers_confirm_or_cancel() {
        let keys = KeysConfig::default();
        let state = sidebar(Mode::Delete {
            session_name: "g/x".into(),
            label: "x".into(),
        });
        assert_eq!(
            resolve_action(key(CtCode::Char('y')), &state, &keys),
            Some(Action::Confirm)
        );
        assert_eq!(
            resolve_action(key(CtCode::Char('n')), &state, &keys),
            Some(Action::Cancel)
        );
        assert_eq!(resolve_action(key(CtCode::Char('x')), &state, &keys), None);
    }
}
