use crate::theme::Theme;
use grove_core::{sidebar::SidebarState, tree::TreeNode};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

const CURRENT_MARKER: &str = "●";
const NOTIFICATION_MARKER: &str = "★";

fn row<'a>(state: &'a SidebarState, node_idx: usize, theme: &Theme) -> Line<'a> {
    let view = state.view();
    match &state.nodes[node_idx] {
        TreeNode::Repo { name, .. } => {
            let fold = if view.is_collapsed(name) { "▸" } else { "▾" };
            Line::from(vec![
                Span::styled(format!("{fold} {name}"), theme.repo_header()),
                Span::styled(
                    format!(" ({})", view.child_count(name)),
                    Style::default().fg(theme.muted),
                ),
            ])
        }
        TreeNode::Workspace { repo, label, .. } => {
            let indent = if repo.is_some() { "  " } else { "" };
            let workspace = state.workspace_at(node_idx);
            let current = workspace.is_some_and(|ws| state.is_current(ws));
            let marker = if current {
                Span::styled(
                    format!("{CURRENT_MARKER} "),
                    Style::default().fg(theme.success),
                )
            } else {
                Span::raw("  ")
            };
            let mut spans = vec![Span::raw(indent), marker, Span::raw(label.as_str())];
            if workspace.is_some_and(|ws| ws.notification.is_some()) {
                spans.push(Span::styled(
                    format!(" {NOTIFICATION_MARKER}"),
                    Style::default()
                        .fg(theme.warning)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            Line::from(spans)
        }
    }
}

pub fn draw(f: &mut Frame, area: Rect, state: &SidebarState, theme: &Theme) {
    let visible = state.visible();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|&idx| ListItem::new(row(state, idx, theme)))
        .collect();

    let filter = state.active_filter();
    let title = if filter.is_empty() {
        " grove ".to_string()
    } else {
        format!(" grove /{filter} ")
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(theme.border)),
        )
        .highlight_style(theme.highlight());

    let mut list_state = ListState::default();
    list_state.select(
        state
            .cursor
            .and_then(|cursor| visible.iter().position(|&idx| idx == cursor)),
    );
    f.render_stateful_widget(list, area, &mut list_state);
}

/// Notification text of the workspace under the cursor, if any.
pub fn preview(state: &SidebarState) -> Option<&str> {
    state
        .selected_workspace()
        .and_then(|ws| ws.notification.as_deref())
}

pub fn draw_preview(f: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {NOTIFICATION_MARKER} "),
            Style::default().fg(theme.warning),
        ),
        Span::raw(message),
    ]);
    f.render_widget(ratatui::widgets::Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::{
        config::ThemeConfig,
        store::{State, Workspace},
    };
    use ratatui::{Terminal, backend::TestBackend};
    use std::path::PathBuf;

    fn rendered(state: &SidebarState) -> String {
        let theme = Theme::from_config(&ThemeConfig::default());
        let mut terminal = Terminal::new(TestBackend::new(30, 8)).unwrap();
        terminal
            .draw(|f| draw(f, f.area(), state, &theme))
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(usize::from(buffer.area.width))
            .map(|cells| cells.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sample() -> SidebarState {
        let mut doc = State::default();
        doc.add_workspace(Workspace::worktree(
            "api",
            PathBuf::from("/code/api"),
            PathBuf::from("/code/api/.grove/worktrees/feat-x"),
            "feat-x",
        ))
        .unwrap();
        doc.add_workspace(Workspace::plain("notes", PathBuf::from("/tmp")))
            .unwrap();
        doc.set_notification("g/notes", "tests passed");
        SidebarState::new(doc, vec!["api".into()], Some("g/api/feat-x".into()))
    }

    #[test]
    fn renders_headers_markers_and_badges() {
        let screen = rendered(&sample());
        assert!(screen.contains("▾ api (1)"), "{screen}");
        assert!(screen.contains("● feat-x"), "{screen}");
        assert!(screen.contains("notes ★"), "{screen}");
    }

    #[test]
    fn collapsed_repo_hides_children() {
        let mut state = sample();
        state.doc.toggle_collapsed("api");
        state.clamp_cursor();
        let screen = rendered(&state);
        assert!(screen.contains("▸ api (1)"), "{screen}");
        assert!(!screen.contains("feat-x"), "{screen}");
    }

    #[test]
    fn preview_follows_cursor() {
        let mut state = sample();
        assert_eq!(preview(&state), None);
        state.focus_session("g/notes");
        assert_eq!(preview(&state), Some("tests passed"));
    }
}
