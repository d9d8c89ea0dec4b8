use crate::theme::Theme;
use grove_core::{config::KeysConfig, sidebar::Mode};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Key hints for the commands of `mode`, e.g. `enter open  c new  q quit`.
pub fn hints<'a>(mode: &Mode, keys: &KeysConfig, theme: &Theme) -> Line<'a> {
    let keymap = keys.keymap_for_mode(mode);
    let key_style = Style::default().fg(theme.hint).add_modifier(Modifier::BOLD);
    let label_style = Style::default().fg(theme.muted);

    let mut spans = Vec::new();
    for command in mode.footer_commands() {
        let Some(key) = KeysConfig::find_key(&keymap, command) else {
            continue;
        };
        if !spans.is_empty() {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(key.to_string(), key_style));
        spans.push(Span::styled(format!(" {}", command.label()), label_style));
    }
    Line::from(spans)
}

pub fn draw(f: &mut Frame, area: Rect, mode: &Mode, keys: &KeysConfig, theme: &Theme) {
    f.render_widget(Paragraph::new(hints(mode, keys, theme)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::{config::ThemeConfig, sidebar::TextInput};

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn browse_hints_use_bound_keys() {
        let theme = Theme::from_config(&ThemeConfig::default());
        let line = hints(&Mode::Browse, &KeysConfig::default(), &theme);
        let rendered = text(&line);
        assert!(rendered.starts_with("enter "), "{rendered}");
        assert!(rendered.contains("c "), "{rendered}");
        assert!(rendered.contains("/ "), "{rendered}");
    }

    #[test]
    fn unbound_commands_are_skipped() {
        let theme = Theme::from_config(&ThemeConfig::default());
        let mut keys = KeysConfig::default();
        keys.confirm_cancel.clear();
        let line = hints(&Mode::Filter(TextInput::default()), &keys, &theme);
        assert!(line.spans.is_empty());
    }
}
