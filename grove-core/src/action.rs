/// Every user interaction produces an Action. Key handling never calls git or tmux directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,

    // Tree movement
    MoveUp,
    MoveDown,
    MoveTop,
    MoveBottom,

    // Browse
    Activate,
    ToggleExpand,
    NewWorkspace,
    DeleteWorkspace,
    RenameWorkspace,
    StartFilter,
    Reload,

    // Text input (create form, filter, rename)
    InputPush(char),
    InputBackspace,
    InputDeleteWord,
    CursorLeft,
    CursorRight,
    CursorStart,
    CursorEnd,

    // Modal
    Confirm,
    Cancel,
}
