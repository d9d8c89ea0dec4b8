use grove_core::config::{NamedColor, ThemeColor, ThemeConfig};
use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub accent: Color,
    pub secondary: Color,
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub muted: Color,
    pub border: Color,
    pub hint: Color,
    pub highlight_fg: Color,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Self {
        Self {
            accent: to_ratatui_color(&config.accent),
            secondary: to_ratatui_color(&config.secondary),
            success: to_ratatui_color(&config.success),
            error: to_ratatui_color(&config.error),
            warning: to_ratatui_color(&config.warning),
            muted: to_ratatui_color(&config.muted),
            border: to_ratatui_color(&config.border),
            hint: to_ratatui_color(&config.hint),
            highlight_fg: to_ratatui_color(&config.highlight_fg),
        }
    }

    /// Row under the cursor.
    pub fn highlight(&self) -> Style {
        Style::default()
            .bg(self.accent)
            .fg(self.highlight_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn repo_header(&self) -> Style {
        Style::default()
            .fg(self.secondary)
            .add_modifier(Modifier::BOLD)
    }
}

fn to_ratatui_color(color: &ThemeColor) -> Color {
    match color {
        ThemeColor::Rgb(r, g, b) => Color::Rgb(*r, *g, *b),
        ThemeColor::Named(named) => match named {
            NamedColor::Black => Color::Black,
            NamedColor::Red => Color::Red,
            NamedColor::Green => Color::Green,
            NamedColor::Yellow => Color::Yellow,
            NamedColor::Blue => Color::Blue,
            NamedColor::Magenta => Color::Magenta,
            NamedColor::Cyan => Color::Cyan,
            NamedColor::White => Color::White,
            NamedColor::Gray => Color::Gray,
            NamedColor::DarkGray => Color::DarkGray,
        },
    }
}
