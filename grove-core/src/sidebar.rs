//! Sidebar state: the persisted document, the derived tree, the cursor and
//! the active mode. Rendering and key handling live in `grove-tui`; every
//! transition that mutates the document goes through the workflows in
//! [`crate::workflow`] and then hands the new document to
//! [`SidebarState::replace_document`].

use crate::{
    config::keys::Command,
    store::{State, Workspace},
    tree::{TreeNode, build_tree},
    visibility::{Direction, View},
};
use unicode_segmentation::UnicodeSegmentation;

/// Single-line text input with a grapheme-aware byte cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub text: String,
    pub cursor: usize,
}

#[derive(Clone, Copy)]
struct GraphemeSpan {
    start: usize,
    end: usize,
    is_whitespace: bool,
}

impl TextInput {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn value(&self) -> &str {
        self.text.trim()
    }

    fn grapheme_spans(&self) -> Vec<GraphemeSpan> {
        self.text
            .grapheme_indices(true)
            .map(|(start, grapheme)| GraphemeSpan {
                start,
                end: start + grapheme.len(),
                is_whitespace: grapheme.chars().all(char::is_whitespace),
            })
            .collect()
    }

    fn boundaries(&self) -> Vec<usize> {
        let mut boundaries: Vec<usize> = self.text.grapheme_indices(true).map(|(i, _)| i).collect();
        boundaries.push(self.text.len());
        boundaries
    }

    /// Snap the cursor onto a grapheme boundary and return that boundary's index.
    fn snap_cursor(&mut self, boundaries: &[usize]) -> usize {
        let cursor = self.cursor.min(self.text.len());
        let idx = match boundaries.binary_search(&cursor) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        self.cursor = boundaries.get(idx).copied().unwrap_or(0);
        idx
    }

    /// Start of the word before `from`, skipping trailing whitespace first.
    fn prev_word_boundary(&self, from: usize) -> usize {
        let spans = self.grapheme_spans();
        let from = from.min(self.text.len());
        let mut idx = spans.iter().take_while(|span| span.end <= from).count();

        while idx > 0 && spans[idx - 1].is_whitespace {
            idx -= 1;
        }
        while idx > 0 && !spans[idx - 1].is_whitespace {
            idx -= 1;
        }
        spans.get(idx).map_or(self.text.len().min(from), |span| span.start)
    }

    pub fn insert_char(&mut self, c: char) {
        let boundaries = self.boundaries();
        self.snap_cursor(&boundaries);
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Remove the grapheme before the cursor. Returns false at the start of input.
    pub fn backspace(&mut self) -> bool {
        let boundaries = self.boundaries();
        let idx = self.snap_cursor(&boundaries);
        if idx == 0 {
            return false;
        }
        let prev = boundaries[idx - 1];
        self.text.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete_word(&mut self) {
        let boundaries = self.boundaries();
        self.snap_cursor(&boundaries);
        let start = self.prev_word_boundary(self.cursor);
        self.text.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn cursor_left(&mut self) {
        let boundaries = self.boundaries();
        let idx = self.snap_cursor(&boundaries);
        if idx > 0 {
            self.cursor = boundaries[idx - 1];
        }
    }

    pub fn cursor_right(&mut self) {
        let boundaries = self.boundaries();
        let idx = self.snap_cursor(&boundaries);
        if idx + 1 < boundaries.len() {
            self.cursor = boundaries[idx + 1];
        }
    }

    pub fn cursor_start(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.text.len();
    }
}

/// What the create form will produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTarget {
    /// A worktree of the named repo; the input is the branch.
    Worktree { repo: String },
    /// A plain workspace in the home directory; the input is its name.
    Plain,
}

/// The create sub-form. An empty input asks for a generated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateForm {
    pub target: CreateTarget,
    pub input: TextInput,
    pub error: Option<String>,
}

impl CreateForm {
    pub fn plain() -> Self {
        Self {
            target: CreateTarget::Plain,
            input: TextInput::default(),
            error: None,
        }
    }

    pub fn worktree(repo: &str) -> Self {
        Self {
            target: CreateTarget::Worktree {
                repo: repo.to_string(),
            },
            input: TextInput::default(),
            error: None,
        }
    }

    pub fn title(&self) -> String {
        match &self.target {
            CreateTarget::Worktree { repo } => format!("New worktree in {repo}"),
            CreateTarget::Plain => "New workspace".to_string(),
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self.target {
            CreateTarget::Worktree { .. } => "branch (empty: random)",
            CreateTarget::Plain => "name (empty: random)",
        }
    }
}

/// Sidebar modes. Each carries only what its transitions need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Create(CreateForm),
    Delete { session_name: String, label: String },
    /// Text being typed; applied live and committed on confirm.
    Filter(TextInput),
    Rename { session_name: String, input: TextInput },
}

impl Mode {
    /// Commands to show in the footer bar, in display order.
    pub fn footer_commands(&self) -> &'static [Command] {
        match self {
            Mode::Browse => &[
                Command::Activate,
                Command::NewWorkspace,
                Command::DeleteWorkspace,
                Command::RenameWorkspace,
                Command::StartFilter,
                Command::Quit,
            ],
            Mode::Create(_) | Mode::Filter(_) | Mode::Rename { .. } | Mode::Delete { .. } => {
                &[Command::Confirm, Command::Cancel]
            }
        }
    }

    /// The text input receiving typed characters, if any.
    pub fn input_mut(&mut self) -> Option<&mut TextInput> {
        match self {
            Mode::Create(form) => Some(&mut form.input),
            Mode::Filter(input) | Mode::Rename { input, .. } => Some(input),
            Mode::Browse | Mode::Delete { .. } => None,
        }
    }

    pub fn input(&self) -> Option<&TextInput> {
        match self {
            Mode::Create(form) => Some(&form.input),
            Mode::Filter(input) | Mode::Rename { input, .. } => Some(input),
            Mode::Browse | Mode::Delete { .. } => None,
        }
    }
}

/// Identity of a node that survives a tree rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKey {
    Repo(String),
    Session(String),
}

/// Everything the sidebar renders from.
///
/// `cursor` indexes `nodes`; it is always either `None` (nothing visible) or
/// a visible node.
#[derive(Debug, Clone)]
pub struct SidebarState {
    pub doc: State,
    pub repo_order: Vec<String>,
    pub nodes: Vec<TreeNode>,
    pub cursor: Option<usize>,
    /// Committed filter; the live one in [`Mode::Filter`] takes precedence.
    pub filter: String,
    pub mode: Mode,
    pub error: Option<String>,
    /// tmux session the sidebar was opened from.
    pub current_session: Option<String>,
}

impl SidebarState {
    pub fn new(doc: State, repo_order: Vec<String>, current_session: Option<String>) -> Self {
        let nodes = build_tree(&doc, &repo_order);
        let mut state = Self {
            doc,
            repo_order,
            nodes,
            cursor: None,
            filter: String::new(),
            mode: Mode::Browse,
            error: None,
            current_session,
        };
        let start = state
            .current_session
            .clone()
            .and_then(|session| state.visible_node_for_session(&session));
        state.cursor = start.or_else(|| state.view().first());
        state
    }

    pub fn active_filter(&self) -> &str {
        match &self.mode {
            Mode::Filter(input) => input.value(),
            _ => &self.filter,
        }
    }

    pub fn view(&self) -> View<'_> {
        View::new(&self.nodes, &self.doc.collapsed, self.active_filter())
    }

    pub fn visible(&self) -> Vec<usize> {
        self.view().visible()
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        self.cursor = self.view().move_cursor(self.cursor, direction);
    }

    pub fn move_to_top(&mut self) {
        self.cursor = self.view().first();
    }

    pub fn move_to_bottom(&mut self) {
        self.cursor = self.view().last();
    }

    pub fn clamp_cursor(&mut self) {
        self.cursor = self.view().clamp_cursor(self.cursor);
    }

    pub fn selected_node(&self) -> Option<&TreeNode> {
        self.cursor.and_then(|idx| self.nodes.get(idx))
    }

    pub fn selected_workspace(&self) -> Option<&Workspace> {
        self.selected_node()
            .and_then(TreeNode::workspace_index)
            .and_then(|idx| self.doc.workspaces.get(idx))
    }

    /// Repo of the node under the cursor: the header itself or a worktree's parent.
    pub fn selected_repo(&self) -> Option<&str> {
        self.selected_node().and_then(TreeNode::repo)
    }

    pub fn workspace_at(&self, node_idx: usize) -> Option<&Workspace> {
        self.nodes
            .get(node_idx)
            .and_then(TreeNode::workspace_index)
            .and_then(|idx| self.doc.workspaces.get(idx))
    }

    pub fn is_current(&self, workspace: &Workspace) -> bool {
        self.current_session.as_deref() == Some(workspace.session_name.as_str())
    }

    fn node_for_session(&self, session_name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| {
            node.workspace_index()
                .and_then(|idx| self.doc.workspaces.get(idx))
                .is_some_and(|ws| ws.session_name == session_name)
        })
    }

    fn visible_node_for_session(&self, session_name: &str) -> Option<usize> {
        self.node_for_session(session_name)
            .filter(|idx| self.visible().contains(idx))
    }

    fn selected_key(&self) -> Option<NodeKey> {
        match self.selected_node()? {
            TreeNode::Repo { name, .. } => Some(NodeKey::Repo(name.clone())),
            TreeNode::Workspace { .. } => self
                .selected_workspace()
                .map(|ws| NodeKey::Session(ws.session_name.clone())),
        }
    }

    fn node_for_key(&self, key: &NodeKey) -> Option<usize> {
        match key {
            NodeKey::Repo(repo) => self
                .nodes
                .iter()
                .position(|node| matches!(node, TreeNode::Repo { name, .. } if name == repo)),
            NodeKey::Session(session) => self.node_for_session(session),
        }
    }

    /// Swap in a freshly loaded document and rebuild the tree.
    ///
    /// The cursor stays on the same repo or workspace when it still exists;
    /// otherwise it is clamped to the nearest visible node.
    pub fn replace_document(&mut self, doc: State) {
        let key = self.selected_key();
        let previous = self.cursor;
        self.doc = doc;
        self.nodes = build_tree(&self.doc, &self.repo_order);
        self.cursor = key
            .and_then(|key| self.node_for_key(&key))
            .or(previous.map(|idx| idx.min(self.nodes.len().saturating_sub(1))));
        self.clamp_cursor();
    }

    /// Put the cursor on the workspace bound to `session_name` if it is visible.
    pub fn focus_session(&mut self, session_name: &str) {
        if let Some(idx) = self.visible_node_for_session(session_name) {
            self.cursor = Some(idx);
        }
    }

    /// Leave any modal state.
    pub fn enter_browse(&mut self) {
        self.mode = Mode::Browse;
        self.clamp_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{doc, worktree};
    use std::path::PathBuf;

    fn sidebar() -> SidebarState {
        let state = doc(vec![
            worktree("api", "main"),
            worktree("api", "feat-x"),
            worktree("web", "main"),
            Workspace::plain("notes", PathBuf::from("/home/u")),
        ]);
        SidebarState::new(state, vec!["api".into(), "web".into()], None)
    }

    #[test]
    fn text_input_edits_at_cursor() {
        let mut input = TextInput::with_text("feat");
        input.cursor_left();
        input.insert_char('X');
        assert_eq!(input.text, "feaXt");
        assert!(input.backspace());
        assert_eq!(input.text, "feat");
        input.cursor_start();
        assert!(!input.backspace());
        input.cursor_end();
        assert_eq!(input.cursor, 4);
    }

    #[test]
    fn text_input_grapheme_combining_mark() {
        let mut input = TextInput::with_text("e\u{0301}");
        input.cursor_left();
        assert_eq!(input.cursor, 0);
        input.cursor_right();
        assert_eq!(input.cursor, input.text.len());
        assert!(input.backspace());
        assert_eq!(input.text, "");
    }

    #[test]
    fn text_input_clamps_inside_grapheme() {
        let mut input = TextInput::with_text("caf\u{e9}");
        input.cursor = 4;
        input.cursor_left();
        assert_eq!(input.cursor, 2);
    }

    #[test]
    fn text_input_delete_word() {
        let mut input = TextInput::with_text("alpha  beta");
        input.delete_word();
        assert_eq!(input.text, "alpha  ");
        input.delete_word();
        assert_eq!(input.text, "");
        assert_eq!(input.cursor, 0);

        let mut middle = TextInput::with_text("one two three");
        middle.cursor = "one two".len();
        middle.delete_word();
        assert_eq!(middle.text, "one  three");
        assert_eq!(middle.cursor, "one ".len());
    }

    #[test]
    fn value_is_trimmed() {
        assert_eq!(TextInput::with_text("  x ").value(), "x");
    }

    #[test]
    fn initial_cursor_on_first_visible_node() {
        let sb = sidebar();
        assert_eq!(sb.cursor, Some(0));
        assert_eq!(sb.selected_repo(), Some("api"));
        assert!(sb.selected_workspace().is_none());
    }

    #[test]
    fn initial_cursor_on_current_session() {
        let sb = SidebarState::new(
            sidebar().doc,
            vec!["api".into(), "web".into()],
            Some("g/web/main".to_string()),
        );
        assert_eq!(sb.selected_workspace().unwrap().session_name, "g/web/main");
    }

    #[test]
    fn live_filter_applies_in_filter_mode() {
        let mut sb = sidebar();
        sb.mode = Mode::Filter(TextInput::with_text("note"));
        let visible = sb.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(sb.nodes[visible[0]].label(), "notes");

        sb.mode = Mode::Browse;
        assert_eq!(sb.visible().len(), sb.nodes.len());
    }

    #[test]
    fn replace_document_keeps_cursor_on_same_workspace() {
        let mut sb = sidebar();
        sb.focus_session("g/notes");
        let mut next = sb.doc.clone();
        next.remove_workspace("g/api/feat-x");
        sb.replace_document(next);
        assert_eq!(sb.selected_workspace().unwrap().session_name, "g/notes");
    }

    #[test]
    fn replace_document_clamps_when_selection_removed() {
        let mut sb = sidebar();
        sb.focus_session("g/web/main");
        let mut next = sb.doc.clone();
        next.remove_workspace("g/web/main");
        sb.replace_document(next);
        // The web header is gone with its last child; the cursor lands on a visible node.
        let cursor = sb.cursor.unwrap();
        assert!(sb.visible().contains(&cursor));
    }

    #[test]
    fn collapse_then_clamp_moves_cursor_to_header() {
        let mut sb = sidebar();
        sb.focus_session("g/api/feat-x");
        sb.doc.toggle_collapsed("api");
        sb.clamp_cursor();
        assert_eq!(sb.selected_node().unwrap().label(), "api");
    }

    #[test]
    fn empty_document_has_no_cursor() {
        let mut sb = SidebarState::new(State::default(), vec!["api".into()], None);
        assert_eq!(sb.cursor, None);
        sb.move_cursor(Direction::Down);
        assert_eq!(sb.cursor, None);
        assert!(sb.selected_workspace().is_none());
    }

    #[test]
    fn input_accessors_follow_mode() {
        let mut mode = Mode::Rename {
            session_name: "g/notes".into(),
            input: TextInput::with_text("notes"),
        };
        mode.input_mut().unwrap().insert_char('!');
        assert_eq!(mode.input().unwrap().text, "notes!");
        assert!(Mode::Browse.input().is_none());
    }
}
