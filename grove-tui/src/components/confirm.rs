use crate::theme::Theme;
use grove_core::{
    config::{KeysConfig, keys::Command},
    sidebar::Mode,
};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Delete confirmation overlay. Draws nothing outside [`Mode::Delete`].
pub fn draw(f: &mut Frame, area: Rect, mode: &Mode, theme: &Theme, keys: &KeysConfig) {
    let Mode::Delete { label, .. } = mode else {
        return;
    };

    let keymap = keys.keymap_for_mode(mode);
    let confirm_key = KeysConfig::find_key(&keymap, &Command::Confirm)
        .map_or("enter".to_string(), |k| k.to_string());
    let cancel_key = KeysConfig::find_key(&keymap, &Command::Cancel)
        .map_or("esc".to_string(), |k| k.to_string());
    let key_style = Style::default().fg(theme.hint).add_modifier(Modifier::BOLD);

    let text = vec![
        Line::from(vec![
            Span::raw("Delete "),
            Span::styled(
                format!("\"{label}\""),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("?"),
        ]),
        Line::raw(""),
        Line::from(vec![
            Span::styled(confirm_key, key_style),
            Span::raw(" delete  "),
            Span::styled(cancel_key, key_style),
            Span::raw(" keep"),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Confirm Delete ")
        .border_style(Style::default().fg(theme.error));

    let popup = super::centered_rect(90, 30, area);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        popup,
    );
}
