use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use quill_core::config::Settings;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Clear;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::theme::Theme;

const FIELDS: [&str; 3] = ["Base URL", "API key", "Model"];

/// Outcome of one key handled by the panel.
pub(crate) enum SettingsOutcome {
    Open,
    /// Save requested with the edited settings.
    Save(Settings),
    Close,
}

/// Modal form editing the three connection fields. Edits are staged locally
/// and only written back wholesale on Enter, so closing the panel never
/// leaves half-updated settings behind.
pub(crate) struct SettingsPanel {
    values: [String; 3],
    selected: usize,
}

impl SettingsPanel {
    pub(crate) fn new(settings: &Settings) -> Self {
        Self {
            values: [
                settings.base_url.clone(),
                settings.api_key.clone(),
                settings.model.clone(),
            ],
            selected: 0,
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> SettingsOutcome {
        match key.code {
            KeyCode::Esc => return SettingsOutcome::Close,
            KeyCode::Enter => {
                return SettingsOutcome::Save(Settings {
                    base_url: self.values[0].trim().to_string(),
                    api_key: self.values[1].trim().to_string(),
                    model: self.values[2].trim().to_string(),
                });
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.selected = (self.selected + FIELDS.len() - 1) % FIELDS.len();
            }
            KeyCode::Down | KeyCode::Tab => {
                self.selected = (self.selected + 1) % FIELDS.len();
            }
            KeyCode::Backspace => {
                self.values[self.selected].pop();
            }
            KeyCode::Char(c) => self.values[self.selected].push(c),
            _ => {}
        }
        SettingsOutcome::Open
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect, theme: Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Settings ")
            .style(theme.text());

        let mut lines = Vec::new();
        for (i, label) in FIELDS.iter().enumerate() {
            let value = if i == 1 {
                // Mask the credential; show just enough to recognize it.
                mask_key(&self.values[i])
            } else {
                self.values[i].clone()
            };
            let style = if i == self.selected {
                theme.selection()
            } else {
                theme.text()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{label:>8}: "), theme.dim()),
                Span::styled(value, style),
            ]));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Tab next field · Enter save · Esc discard",
            theme.dim(),
        )));

        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let visible: String = key.chars().take(6).collect();
    format!("{visible}…")
}
