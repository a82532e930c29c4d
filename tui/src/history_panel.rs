use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use quill_core::history::HistoryStore;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Clear;
use ratatui::widgets::Paragraph;

use crate::theme::Theme;

pub(crate) enum HistoryOutcome {
    Open,
    /// Restore the archived conversation at this index.
    Restore(usize),
    /// Delete the archived conversation at this index.
    Delete(usize),
    ClearAll,
    Close,
}

/// Modal list of archived conversations, newest last, matching the order of
/// the backing store.
#[derive(Default)]
pub(crate) struct HistoryPanel {
    selected: usize,
}

impl HistoryPanel {
    pub(crate) fn handle_key(&mut self, key: KeyEvent, len: usize) -> HistoryOutcome {
        match key.code {
            KeyCode::Esc => return HistoryOutcome::Close,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down if len > 0 => self.selected = (self.selected + 1).min(len - 1),
            KeyCode::Enter if len > 0 => return HistoryOutcome::Restore(self.selected),
            KeyCode::Char('d') | KeyCode::Delete if len > 0 => {
                let index = self.selected;
                self.selected = self.selected.min(len.saturating_sub(2));
                return HistoryOutcome::Delete(index);
            }
            KeyCode::Char('c') => return HistoryOutcome::ClearAll,
            _ => {}
        }
        HistoryOutcome::Open
    }

    pub(crate) fn render(&self, frame: &mut Frame, area: Rect, store: &HistoryStore, theme: Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Chat history ")
            .style(theme.text());

        let mut lines = Vec::new();
        if store.is_empty() {
            lines.push(Line::from(Span::styled("No conversations yet", theme.dim())));
        } else {
            for index in 0..store.len() {
                let style = if index == self.selected {
                    theme.selection()
                } else {
                    theme.text()
                };
                lines.push(Line::from(Span::styled(store.preview(index), style)));
            }
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Enter open · d delete · c clear all · Esc close",
            theme.dim(),
        )));

        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn selection_is_clamped_to_the_list() {
        let mut panel = HistoryPanel::default();
        panel.handle_key(key(KeyCode::Down), 2);
        panel.handle_key(key(KeyCode::Down), 2);
        panel.handle_key(key(KeyCode::Down), 2);
        assert!(matches!(
            panel.handle_key(key(KeyCode::Enter), 2),
            HistoryOutcome::Restore(1)
        ));
    }

    #[test]
    fn delete_reports_the_selected_index_and_keeps_selection_valid() {
        let mut panel = HistoryPanel::default();
        panel.handle_key(key(KeyCode::Down), 2);
        assert!(matches!(
            panel.handle_key(key(KeyCode::Char('d')), 2),
            HistoryOutcome::Delete(1)
        ));
        // One item remains; Enter must restore index 0.
        assert!(matches!(
            panel.handle_key(key(KeyCode::Enter), 1),
            HistoryOutcome::Restore(0)
        ));
    }

    #[test]
    fn keys_needing_entries_are_ignored_when_empty() {
        let mut panel = HistoryPanel::default();
        assert!(matches!(
            panel.handle_key(key(KeyCode::Enter), 0),
            HistoryOutcome::Open
        ));
        assert!(matches!(
            panel.handle_key(key(KeyCode::Char('d')), 0),
            HistoryOutcome::Open
        ));
    }
}
