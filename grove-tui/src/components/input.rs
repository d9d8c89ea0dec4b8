use grove_core::sidebar::TextInput;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Paragraph},
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

pub struct InputStyle<'a> {
    pub title: &'a str,
    pub placeholder: &'a str,
    /// Validation message shown on the bottom border; also recolours the box.
    pub error: Option<&'a str>,
    pub border_color: Color,
    pub muted_color: Color,
    pub error_color: Color,
}

/// Byte offset to start rendering from so the cursor fits in `width` columns,
/// and the cursor column relative to that offset.
///
/// Walks back from the cursor one grapheme at a time; the last column is kept
/// free for the cursor itself.
fn scroll_to_cursor(input: &TextInput, width: u16) -> (usize, u16) {
    let Some(before) = input.text.get(..input.cursor) else {
        return (0, 0);
    };
    let limit = usize::from(width.saturating_sub(1));
    let mut start = before.len();
    let mut col = 0;
    for (offset, grapheme) in before.grapheme_indices(true).rev() {
        let w = grapheme.width();
        if col + w > limit {
            break;
        }
        col += w;
        start = offset;
    }
    (start, u16::try_from(col).unwrap_or(u16::MAX))
}

pub fn draw(f: &mut Frame, area: Rect, style: &InputStyle<'_>, input: &TextInput) {
    let border = style.error.map_or(style.border_color, |_| style.error_color);
    let mut block = Block::bordered()
        .title(format!(" {} ", style.title))
        .border_style(Style::default().fg(border));
    if let Some(error) = style.error {
        block = block.title_bottom(Line::styled(
            format!(" {error} "),
            Style::default().fg(style.error_color),
        ));
    }
    let inner = block.inner(area);

    let (content, cursor_col) = if input.is_empty() {
        (Line::styled(style.placeholder, Style::default().fg(style.muted_color)), 0)
    } else {
        let (start, col) = scroll_to_cursor(input, inner.width);
        (Line::raw(input.text.get(start..).unwrap_or_default()), col)
    };
    f.render_widget(Paragraph::new(content).block(block), area);

    if inner.width > 0 && inner.height > 0 {
        f.set_cursor_position((inner.x.saturating_add(cursor_col), inner.y));
    }
}
