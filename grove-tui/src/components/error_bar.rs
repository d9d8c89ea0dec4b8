use crate::theme::Theme;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Span,
    widgets::Paragraph,
};

pub fn draw(f: &mut Frame, area: Rect, error: &str, theme: &Theme) {
    let error_line = Paragraph::new(Span::styled(
        format!(" {error}"),
        Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
    ));
    f.render_widget(error_line, area);
}
