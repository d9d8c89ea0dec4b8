use crate::keyboard::{KeyCode, KeyEvent};
use crate::sidebar::Mode;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

/// Commands that can be bound to keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// No-op: explicitly unbinds a key (removes inherited/default binding)
    Noop,

    Quit,

    // Tree movement
    MoveUp,
    MoveDown,
    MoveTop,
    MoveBottom,

    // Browse actions
    Activate,
    ToggleExpand,
    NewWorkspace,
    DeleteWorkspace,
    RenameWorkspace,
    StartFilter,
    Reload,

    // Text-edit commands
    DeleteBackwardChar,
    DeleteBackwardWord,
    MoveCursorLeft,
    MoveCursorRight,
    MoveCursorStart,
    MoveCursorEnd,

    // Generic confirm/cancel commands
    Confirm,
    Cancel,
}

const COMMAND_NAMES: &[(&str, Command)] = &[
    ("noop", Command::Noop),
    ("quit", Command::Quit),
    ("move_up", Command::MoveUp),
    ("move_down", Command::MoveDown),
    ("move_top", Command::MoveTop),
    ("move_bottom", Command::MoveBottom),
    ("activate", Command::Activate),
    ("toggle_expand", Command::ToggleExpand),
    ("new_workspace", Command::NewWorkspace),
    ("delete_workspace", Command::DeleteWorkspace),
    ("rename_workspace", Command::RenameWorkspace),
    ("start_filter", Command::StartFilter),
    ("reload", Command::Reload),
    ("delete_backward_char", Command::DeleteBackwardChar),
    ("delete_backward_word", Command::DeleteBackwardWord),
    ("move_cursor_left", Command::MoveCursorLeft),
    ("move_cursor_right", Command::MoveCursorRight),
    ("move_cursor_start", Command::MoveCursorStart),
    ("move_cursor_end", Command::MoveCursorEnd),
    ("confirm", Command::Confirm),
    ("cancel", Command::Cancel),
];

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if matches!(s, "none" | "unbound") {
            return Ok(Command::Noop);
        }
        COMMAND_NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, cmd)| cmd.clone())
            .ok_or_else(|| format!("Unknown command: {s}"))
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = COMMAND_NAMES
            .iter()
            .find(|(_, cmd)| cmd == self)
            .map_or("noop", |(name, _)| name);
        f.write_str(name)
    }
}

impl Command {
    /// Short label for the footer bar
    pub fn label(&self) -> &'static str {
        match self {
            Command::Noop => "unbound",
            Command::Quit => "quit",
            Command::MoveUp => "up",
            Command::MoveDown => "down",
            Command::MoveTop => "top",
            Command::MoveBottom => "bottom",
            Command::Activate => "open",
            Command::ToggleExpand => "fold",
            Command::NewWorkspace => "new",
            Command::DeleteWorkspace => "delete",
            Command::RenameWorkspace => "rename",
            Command::StartFilter => "filter",
            Command::Reload => "reload",
            Command::DeleteBackwardChar => "backspace",
            Command::DeleteBackwardWord => "delete word",
            Command::MoveCursorLeft => "left",
            Command::MoveCursorRight => "right",
            Command::MoveCursorStart => "start",
            Command::MoveCursorEnd => "end",
            Command::Confirm => "confirm",
            Command::Cancel => "cancel",
        }
    }
}

/// Key bindings for a specific layer/mode
pub type KeyMap = HashMap<KeyEvent, Command>;

/// Complete key binding configuration, composed from reusable layers.
#[derive(Debug, Clone)]
pub struct KeysConfig {
    pub general: KeyMap,
    pub text_edit: KeyMap,
    pub list_navigation: KeyMap,
    pub confirm_cancel: KeyMap,
    pub browse: KeyMap,
    pub confirm_delete: KeyMap,
}

/// Intermediate structure for deserializing key bindings
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeysConfigRaw {
    #[serde(default)]
    general: HashMap<String, String>,
    #[serde(default)]
    text_edit: HashMap<String, String>,
    #[serde(default)]
    list_navigation: HashMap<String, String>,
    #[serde(default)]
    confirm_cancel: HashMap<String, String>,
    #[serde(default)]
    browse: HashMap<String, String>,
    #[serde(default)]
    confirm_delete: HashMap<String, String>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn layer(bindings: &[(KeyEvent, Command)]) -> KeyMap {
    bindings.iter().cloned().collect()
}

impl KeysConfig {
    pub fn new() -> Self {
        Self {
            general: layer(&[(KeyEvent::ctrl('c'), Command::Quit)]),
            text_edit: layer(&[
                (KeyEvent::plain(KeyCode::Backspace), Command::DeleteBackwardChar),
                (KeyEvent::ctrl('w'), Command::DeleteBackwardWord),
                (KeyEvent::plain(KeyCode::Left), Command::MoveCursorLeft),
                (KeyEvent::plain(KeyCode::Right), Command::MoveCursorRight),
                (KeyEvent::plain(KeyCode::Home), Command::MoveCursorStart),
                (KeyEvent::plain(KeyCode::End), Command::MoveCursorEnd),
                (KeyEvent::ctrl('a'), Command::MoveCursorStart),
                (KeyEvent::ctrl('e'), Command::MoveCursorEnd),
            ]),
            list_navigation: layer(&[
                (KeyEvent::plain(KeyCode::Up), Command::MoveUp),
                (KeyEvent::plain(KeyCode::Down), Command::MoveDown),
                (KeyEvent::char('k'), Command::MoveUp),
                (KeyEvent::char('j'), Command::MoveDown),
                (KeyEvent::ctrl('p'), Command::MoveUp),
                (KeyEvent::ctrl('n'), Command::MoveDown),
                (KeyEvent::char('g'), Command::MoveTop),
                (KeyEvent::char('G'), Command::MoveBottom),
            ]),
            confirm_cancel: layer(&[
                (KeyEvent::plain(KeyCode::Enter), Command::Confirm),
                (KeyEvent::plain(KeyCode::Esc), Command::Cancel),
            ]),
            browse: layer(&[
                (KeyEvent::plain(KeyCode::Enter), Command::Activate),
                (KeyEvent::char('o'), Command::ToggleExpand),
                (KeyEvent::char('c'), Command::NewWorkspace),
                (KeyEvent::char('d'), Command::DeleteWorkspace),
                (KeyEvent::char('R'), Command::RenameWorkspace),
                (KeyEvent::char('/'), Command::StartFilter),
                (KeyEvent::char('r'), Command::Reload),
                (KeyEvent::char('q'), Command::Quit),
                (KeyEvent::plain(KeyCode::Esc), Command::Quit),
            ]),
            confirm_delete: layer(&[
                (KeyEvent::char('y'), Command::Confirm),
                (KeyEvent::char('n'), Command::Cancel),
            ]),
        }
    }

    /// Build the effective keymap for a given sidebar mode using precedence:
    /// general < shared layers < mode-specific
    pub fn keymap_for_mode(&self, mode: &Mode) -> KeyMap {
        let mut combined = KeyMap::new();
        Self::apply_layer(&mut combined, &self.general);

        match mode {
            Mode::Browse => {
                Self::apply_layer(&mut combined, &self.list_navigation);
                Self::apply_layer(&mut combined, &self.browse);
            }
            Mode::Create(_) | Mode::Filter(_) | Mode::Rename { .. } => {
                Self::apply_layer(&mut combined, &self.text_edit);
                Self::apply_layer(&mut combined, &self.confirm_cancel);
            }
            Mode::Delete { .. } => {
                Self::apply_layer(&mut combined, &self.confirm_cancel);
                Self::apply_layer(&mut combined, &self.confirm_delete);
            }
        }

        combined
    }

    /// Find the first key bound to a given command in a keymap.
    pub fn find_key(keymap: &KeyMap, command: &Command) -> Option<KeyEvent> {
        // Prefer keys without modifiers
        let mut found: Vec<_> = keymap
            .iter()
            .filter(|(_, cmd)| *cmd == command)
            .map(|(key, _)| *key)
            .collect();
        found.sort_by_key(|key| (key.modifiers, key.code));
        found.into_iter().next()
    }

    fn apply_layer(base: &mut KeyMap, layer: &KeyMap) {
        for (key, command) in layer {
            if *command == Command::Noop {
                base.remove(key);
            } else {
                base.insert(*key, command.clone());
            }
        }
    }

    /// Parse a string representation of keybindings into a `KeyMap`
    fn parse_keymap(raw_map: &HashMap<String, String>) -> Result<KeyMap, String> {
        let mut keymap = KeyMap::new();
        for (key_str, command_str) in raw_map {
            let key_event =
                KeyEvent::from_str(key_str).map_err(|e| format!("Invalid key '{key_str}': {e}"))?;
            let command = Command::from_str(command_str)
                .map_err(|e| format!("Invalid command '{command_str}': {e}"))?;
            keymap.insert(key_event, command);
        }
        Ok(keymap)
    }

    /// Merge user configuration with defaults.
    ///
    /// Keep `Noop` values so higher-precedence layers can explicitly unbind inherited mappings.
    fn from_raw(raw: &KeysConfigRaw) -> Result<Self, String> {
        let mut config = Self::default();

        config.general.extend(Self::parse_keymap(&raw.general)?);
        config.text_edit.extend(Self::parse_keymap(&raw.text_edit)?);
        config
            .list_navigation
            .extend(Self::parse_keymap(&raw.list_navigation)?);
        config
            .confirm_cancel
            .extend(Self::parse_keymap(&raw.confirm_cancel)?);
        config.browse.extend(Self::parse_keymap(&raw.browse)?);
        config
            .confirm_delete
            .extend(Self::parse_keymap(&raw.confirm_delete)?);

        Ok(config)
    }
}

impl<'de> Deserialize<'de> for KeysConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = KeysConfigRaw::deserialize(deserializer)?;
        KeysConfig::from_raw(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::KeyModifiers;
    use crate::sidebar::{CreateForm, TextInput};

    #[test]
    fn test_command_from_str() {
        assert_eq!(Command::from_str("quit").unwrap(), Command::Quit);
        assert_eq!(
            Command::from_str("rename_workspace").unwrap(),
            Command::RenameWorkspace
        );
        assert!(Command::from_str("invalid_command").is_err());
    }

    #[test]
    fn test_command_display() {
        assert_eq!(Command::Quit.to_string(), "quit");
        assert_eq!(Command::ToggleExpand.to_string(), "toggle_expand");
    }

    #[test]
    fn test_noop_aliases() {
        assert_eq!(Command::from_str("noop").unwrap(), Command::Noop);
        assert_eq!(Command::from_str("none").unwrap(), Command::Noop);
        assert_eq!(Command::from_str("unbound").unwrap(), Command::Noop);
    }

    #[test]
    fn test_parse_keymap() {
        let raw_map = HashMap::from([
            ("C-c".to_string(), "quit".to_string()),
            ("enter".to_string(), "confirm".to_string()),
        ]);

        let keymap = KeysConfig::parse_keymap(&raw_map).unwrap();
        assert_eq!(keymap.len(), 2);
        assert_eq!(keymap.get(&KeyEvent::ctrl('c')), Some(&Command::Quit));
        assert_eq!(
            keymap.get(&KeyEvent::plain(KeyCode::Enter)),
            Some(&Command::Confirm)
        );
    }

    #[test]
    fn test_parse_invalid_key_or_command() {
        let bad_key = HashMap::from([("invalid-key".to_string(), "quit".to_string())]);
        assert!(KeysConfig::parse_keymap(&bad_key).is_err());
        let bad_cmd = HashMap::from([("C-c".to_string(), "invalid_command".to_string())]);
        assert!(KeysConfig::parse_keymap(&bad_cmd).is_err());
    }

    #[test]
    fn test_browse_defaults() {
        let map = KeysConfig::default().keymap_for_mode(&Mode::Browse);
        assert_eq!(map.get(&KeyEvent::char('j')), Some(&Command::MoveDown));
        assert_eq!(
            map.get(&KeyEvent::plain(KeyCode::Enter)),
            Some(&Command::Activate)
        );
        assert_eq!(map.get(&KeyEvent::char('R')), Some(&Command::RenameWorkspace));
        assert_eq!(map.get(&KeyEvent::char('/')), Some(&Command::StartFilter));
        assert_eq!(
            map.get(&KeyEvent::plain(KeyCode::Esc)),
            Some(&Command::Quit)
        );
    }

    #[test]
    fn test_text_modes_leave_letters_unbound() {
        let config = KeysConfig::default();
        for mode in [
            Mode::Filter(TextInput::default()),
            Mode::Create(CreateForm::plain()),
        ] {
            let map = config.keymap_for_mode(&mode);
            assert_eq!(map.get(&KeyEvent::char('j')), None);
            assert_eq!(map.get(&KeyEvent::char('q')), None);
            assert_eq!(
                map.get(&KeyEvent::plain(KeyCode::Esc)),
                Some(&Command::Cancel)
            );
        }
    }

    #[test]
    fn test_delete_confirmation_keys() {
        let map = KeysConfig::default().keymap_for_mode(&Mode::Delete {
            session_name: "g/notes".to_string(),
            label: "notes".to_string(),
        });
        assert_eq!(map.get(&KeyEvent::char('y')), Some(&Command::Confirm));
        assert_eq!(map.get(&KeyEvent::char('n')), Some(&Command::Cancel));
        assert_eq!(
            map.get(&KeyEvent::plain(KeyCode::Esc)),
            Some(&Command::Cancel)
        );
    }

    #[test]
    fn test_mode_precedence_more_specific_wins() {
        let raw = KeysConfigRaw {
            browse: HashMap::from([("C-c".to_string(), "reload".to_string())]),
            ..KeysConfigRaw::default()
        };

        let config = KeysConfig::from_raw(&raw).unwrap();
        let map = config.keymap_for_mode(&Mode::Browse);
        assert_eq!(map.get(&KeyEvent::ctrl('c')), Some(&Command::Reload));
    }

    #[test]
    fn test_noop_can_unbind_inherited_mapping() {
        let raw = KeysConfigRaw {
            browse: HashMap::from([("esc".to_string(), "noop".to_string())]),
            ..KeysConfigRaw::default()
        };

        let config = KeysConfig::from_raw(&raw).unwrap();
        let map = config.keymap_for_mode(&Mode::Browse);
        assert_eq!(map.get(&KeyEvent::plain(KeyCode::Esc)), None);
    }

    #[test]
    fn test_find_key_reverse_lookup() {
        let keymap = KeysConfig::default().keymap_for_mode(&Mode::Browse);
        assert_eq!(
            KeysConfig::find_key(&keymap, &Command::NewWorkspace),
            Some(KeyEvent::char('c'))
        );
        assert_eq!(KeysConfig::find_key(&keymap, &Command::Cancel), None);
        assert_eq!(
            KeysConfig::find_key(&keymap, &Command::Quit),
            Some(KeyEvent::char('q'))
        );
        let modifiers_sort_after_plain = KeysConfig::find_key(&keymap, &Command::MoveDown);
        assert_eq!(
            modifiers_sort_after_plain.map(|k| k.modifiers),
            Some(KeyModifiers::NONE)
        );
    }
}
