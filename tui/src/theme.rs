use quill_core::config::ThemePrefs;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;

/// Palette derived from the persisted dark-mode flag. Applied globally; the
/// toggle re-persists the flag and swaps the palette in place.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Theme {
    pub dark: bool,
}

impl Theme {
    pub(crate) fn from_prefs(prefs: ThemePrefs) -> Self {
        Self {
            dark: prefs.dark_mode,
        }
    }

    pub(crate) fn background(self) -> Color {
        if self.dark { Color::Black } else { Color::White }
    }

    pub(crate) fn text(self) -> Style {
        let fg = if self.dark { Color::Gray } else { Color::Black };
        Style::default().fg(fg).bg(self.background())
    }

    pub(crate) fn dim(self) -> Style {
        Style::default().fg(Color::DarkGray).bg(self.background())
    }

    pub(crate) fn user_label(self) -> Style {
        Style::default()
            .fg(Color::Cyan)
            .bg(self.background())
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn assistant_label(self) -> Style {
        Style::default()
            .fg(Color::Magenta)
            .bg(self.background())
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn error(self) -> Style {
        Style::default()
            .fg(Color::Red)
            .bg(self.background())
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn code(self) -> Style {
        let bg = if self.dark {
            Color::Rgb(30, 30, 40)
        } else {
            Color::Rgb(235, 235, 225)
        };
        Style::default().fg(Color::Green).bg(bg)
    }

    pub(crate) fn code_caption(self) -> Style {
        Style::default()
            .fg(Color::Yellow)
            .bg(self.background())
            .add_modifier(Modifier::ITALIC)
    }

    pub(crate) fn emphasis(self) -> Style {
        self.text().add_modifier(Modifier::ITALIC)
    }

    pub(crate) fn strong(self) -> Style {
        self.text().add_modifier(Modifier::BOLD)
    }

    pub(crate) fn heading(self) -> Style {
        Style::default()
            .fg(Color::Blue)
            .bg(self.background())
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn selection(self) -> Style {
        Style::default().fg(self.background()).bg(Color::Blue)
    }
}
