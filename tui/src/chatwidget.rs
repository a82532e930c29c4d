use std::collections::HashMap;
use std::path::PathBuf;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use futures::StreamExt;
use quill_core::ChatSession;
use quill_core::Message;
use quill_core::ModelClient;
use quill_core::ResponseEvent;
use quill_core::Role;
use quill_core::StreamCursor;
use quill_core::TurnPhase;
use quill_core::TurnStart;
use quill_core::config::Settings;
use quill_core::config::ThemePrefs;
use quill_core::history::HistoryStore;
use ratatui::Frame;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Wrap;
use uuid::Uuid;

use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::clipboard::copy_to_clipboard;
use crate::composer::Composer;
use crate::history_panel::HistoryOutcome;
use crate::history_panel::HistoryPanel;
use crate::markdown::render_message;
use crate::settings_panel::SettingsOutcome;
use crate::settings_panel::SettingsPanel;
use crate::theme::Theme;

enum Overlay {
    None,
    Settings(SettingsPanel),
    History(HistoryPanel),
}

struct CachedRender {
    content_len: usize,
    lines: Vec<Line<'static>>,
}

pub(crate) struct ChatWidget {
    home: PathBuf,
    settings: Settings,
    theme: Theme,
    session: ChatSession,
    history: HistoryStore,
    app_event_tx: AppEventSender,
    composer: Composer,
    overlay: Overlay,
    /// Rendered-line cache per message; the streaming message is re-rendered
    /// only when its cursor reports newly-arrived content.
    render_cache: HashMap<Uuid, CachedRender>,
    stream_cursor: StreamCursor,
    /// Configuration problems are reported inline without ever creating a
    /// message pair; transport errors surface through the session.
    config_banner: Option<String>,
    flash: Option<&'static str>,
    scroll_from_bottom: u16,
    quit: bool,
}

impl ChatWidget {
    pub(crate) fn new(
        home: PathBuf,
        settings: Settings,
        theme_prefs: ThemePrefs,
        history: HistoryStore,
        app_event_tx: AppEventSender,
    ) -> Self {
        Self {
            home,
            settings,
            theme: Theme::from_prefs(theme_prefs),
            session: ChatSession::new(),
            history,
            app_event_tx,
            composer: Composer::default(),
            overlay: Overlay::None,
            render_cache: HashMap::new(),
            stream_cursor: StreamCursor::new(),
            config_banner: None,
            flash: None,
            scroll_from_bottom: 0,
            quit: false,
        }
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.quit
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        self.flash = None;

        match &mut self.overlay {
            Overlay::Settings(panel) => {
                match panel.handle_key(key) {
                    SettingsOutcome::Open => {}
                    SettingsOutcome::Close => self.overlay = Overlay::None,
                    SettingsOutcome::Save(settings) => {
                        self.settings = settings;
                        if let Err(e) = self.settings.save(&self.home) {
                            tracing::error!("failed to persist settings: {e}");
                        }
                        self.config_banner = None;
                        self.flash = Some("settings saved");
                        self.overlay = Overlay::None;
                    }
                }
                return;
            }
            Overlay::History(panel) => {
                match panel.handle_key(key, self.history.len()) {
                    HistoryOutcome::Open => {}
                    HistoryOutcome::Close => self.overlay = Overlay::None,
                    HistoryOutcome::Restore(index) => {
                        if let Some(snapshot) = self.history.get(index) {
                            self.archive_current();
                            self.render_cache.clear();
                            self.session.restore(snapshot);
                        }
                        self.overlay = Overlay::None;
                    }
                    HistoryOutcome::Delete(index) => {
                        if let Err(e) = self.history.delete(index) {
                            tracing::error!("failed to delete conversation: {e}");
                        }
                    }
                    HistoryOutcome::ClearAll => {
                        if let Err(e) = self.history.clear() {
                            tracing::error!("failed to clear history: {e}");
                        }
                    }
                }
                return;
            }
            Overlay::None => {}
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                if self.session.is_loading() {
                    self.session.cancel_turn();
                } else {
                    self.quit = true;
                }
            }
            KeyCode::Char('j') if ctrl => self.composer.newline(),
            KeyCode::Char('n') if ctrl => self.new_conversation(),
            KeyCode::Char('h') if ctrl => self.overlay = Overlay::History(HistoryPanel::default()),
            KeyCode::Char('o') if ctrl => {
                self.overlay = Overlay::Settings(SettingsPanel::new(&self.settings));
            }
            KeyCode::Char('t') if ctrl => self.toggle_theme(),
            KeyCode::Char('y') if ctrl => self.copy_last_assistant_message(),
            KeyCode::Enter => self.submit(),
            KeyCode::Esc => {
                if self.session.is_loading() {
                    self.session.cancel_turn();
                } else {
                    self.config_banner = None;
                }
            }
            KeyCode::Backspace => self.composer.backspace(),
            KeyCode::Left => self.composer.move_left(),
            KeyCode::Right => self.composer.move_right(),
            KeyCode::Home => self.composer.move_home(),
            KeyCode::End => self.composer.move_end(),
            KeyCode::PageUp => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(5);
            }
            KeyCode::PageDown => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(5);
            }
            KeyCode::Char(c) => self.composer.insert_char(c),
            _ => {}
        }
    }

    pub(crate) fn handle_paste(&mut self, pasted: String) {
        if matches!(self.overlay, Overlay::None) {
            self.composer.insert_str(&pasted);
        }
    }

    pub(crate) fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::StreamDelta { turn, delta } => {
                self.session.apply_delta(turn, &delta);
                self.scroll_from_bottom = 0;
            }
            AppEvent::StreamCompleted { turn } => self.session.complete_turn(turn),
            AppEvent::StreamFailed { turn, message } => self.session.fail_turn(turn, message),
        }
    }

    /// Submit the composer contents as a new turn. Requires non-blank input
    /// and complete settings; a configuration problem is reported inline and
    /// the input is left untouched so the user can retry after fixing it.
    fn submit(&mut self) {
        if self.composer.is_empty() {
            return;
        }
        if let Err(e) = self.settings.validate() {
            self.config_banner = Some(e.to_string());
            return;
        }
        self.config_banner = None;

        let input = self.composer.take();
        let Some(start) = self.session.begin_turn(&input) else {
            return;
        };
        self.stream_cursor = StreamCursor::new();
        self.scroll_from_bottom = 0;
        self.spawn_stream(start);
    }

    fn spawn_stream(&self, start: TurnStart) {
        let client = ModelClient::new(self.settings.clone());
        let tx = self.app_event_tx.clone();
        let TurnStart {
            id: turn,
            prompt,
            cancel,
            ..
        } = start;

        tokio::spawn(async move {
            let mut stream = match client.stream(&prompt, cancel).await {
                Ok(stream) => stream,
                Err(e) if e.is_interrupt() => return,
                Err(e) => {
                    tx.send(AppEvent::StreamFailed {
                        turn,
                        message: e.to_string(),
                    });
                    return;
                }
            };
            while let Some(event) = stream.next().await {
                match event {
                    Ok(ResponseEvent::OutputTextDelta(delta)) => {
                        tx.send(AppEvent::StreamDelta { turn, delta });
                    }
                    Ok(ResponseEvent::Completed { .. }) => {
                        tx.send(AppEvent::StreamCompleted { turn });
                        return;
                    }
                    // A cancelled turn is silently discarded.
                    Err(e) if e.is_interrupt() => return,
                    Err(e) => {
                        tx.send(AppEvent::StreamFailed {
                            turn,
                            message: e.to_string(),
                        });
                        return;
                    }
                }
            }
            // Channel closed without a terminal event; treat as completed so
            // the session can decide whether anything arrived.
            tx.send(AppEvent::StreamCompleted { turn });
        });
    }

    /// Archive the live conversation (if any) and start a fresh one.
    fn new_conversation(&mut self) {
        self.archive_current();
        self.render_cache.clear();
        self.config_banner = None;
    }

    fn archive_current(&mut self) {
        if let Some(snapshot) = self.session.take_conversation()
            && let Err(e) = self.history.append(snapshot)
        {
            tracing::error!("failed to archive conversation: {e}");
        }
    }

    fn toggle_theme(&mut self) {
        let prefs = ThemePrefs {
            dark_mode: self.theme.dark,
        }
        .toggled();
        self.theme.dark = prefs.dark_mode;
        if let Err(e) = prefs.save(&self.home) {
            tracing::error!("failed to persist theme: {e}");
        }
        // Cached lines carry the old palette.
        self.render_cache.clear();
    }

    fn copy_last_assistant_message(&mut self) {
        let Some(content) = self
            .session
            .messages()
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.content.is_empty())
            .map(|m| m.content.clone())
        else {
            return;
        };
        if copy_to_clipboard(&content) {
            self.flash = Some("copied to clipboard");
        }
    }

    pub(crate) fn render(&mut self, frame: &mut Frame) {
        let banner = self
            .config_banner
            .clone()
            .or_else(|| self.session.surfaced_error().map(str::to_string));

        let [transcript_area, banner_area, composer_area, status_area] =
            Layout::vertical([
                Constraint::Min(1),
                Constraint::Length(if banner.is_some() { 2 } else { 0 }),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .areas(frame.area());

        frame.render_widget(
            Block::default().style(self.theme.text()),
            frame.area(),
        );
        self.render_transcript(frame, transcript_area);
        if let Some(message) = banner {
            self.render_banner(frame, banner_area, &message);
        }
        self.render_composer(frame, composer_area);
        self.render_status(frame, status_area);

        match &self.overlay {
            Overlay::None => {}
            Overlay::Settings(panel) => {
                panel.render(frame, centered(frame.area(), 60, 8), self.theme);
            }
            Overlay::History(panel) => {
                let height = (self.history.len() as u16 + 4).clamp(5, 20);
                panel.render(
                    frame,
                    centered(frame.area(), 60, height),
                    &self.history,
                    self.theme,
                );
            }
        }
    }

    fn render_transcript(&mut self, frame: &mut Frame, area: Rect) {
        if self.session.messages().is_empty() {
            let empty = Paragraph::new(vec![
                Line::default(),
                Line::from(Span::styled("Start a new conversation", self.theme.strong())),
                Line::from(Span::styled(
                    "Ask anything and get real-time responses.",
                    self.theme.dim(),
                )),
            ])
            .wrap(Wrap { trim: false });
            frame.render_widget(empty, area);
            return;
        }

        let streaming_id = self.session.streaming_message_id();
        let mut lines: Vec<Line<'static>> = Vec::new();
        // Borrow dance: collect ids first so the cache can be updated while
        // iterating message contents.
        let messages: Vec<Message> = self.session.messages().to_vec();
        for message in &messages {
            lines.extend(self.message_header(message, streaming_id == Some(message.id)));
            lines.extend(self.message_lines(message, streaming_id));
            lines.push(Line::default());
        }
        if self.session.phase() == TurnPhase::Sending {
            lines.push(Line::from(Span::styled("thinking…", self.theme.dim())));
        }

        let total = lines.len() as u16;
        let visible = area.height;
        let max_scroll = total.saturating_sub(visible);
        self.scroll_from_bottom = self.scroll_from_bottom.min(max_scroll);
        let skip = max_scroll.saturating_sub(self.scroll_from_bottom);

        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((skip, 0)),
            area,
        );
    }

    fn message_header(&self, message: &Message, streaming: bool) -> Vec<Line<'static>> {
        let (label, style) = match message.role {
            Role::User => ("You", self.theme.user_label()),
            Role::Assistant => ("Assistant", self.theme.assistant_label()),
            Role::System => ("System", self.theme.dim()),
        };
        let mut spans = vec![
            Span::styled(label.to_string(), style),
            Span::styled(
                format!("  {}", message.timestamp.format("%H:%M")),
                self.theme.dim(),
            ),
        ];
        if streaming {
            spans.push(Span::styled("  ●".to_string(), self.theme.assistant_label()));
        }
        vec![Line::from(spans)]
    }

    /// Rendered body lines for one message. Finished messages render once
    /// and come from the cache afterwards; the streaming message re-renders
    /// only when the cursor reports a non-empty suffix, so repeated draws
    /// with unchanged content cost nothing.
    fn message_lines(&mut self, message: &Message, streaming_id: Option<Uuid>) -> Vec<Line<'static>> {
        if streaming_id == Some(message.id) {
            let fresh = !self.stream_cursor.advance(&message.content).is_empty();
            if fresh || !self.render_cache.contains_key(&message.id) {
                let lines = render_message(&message.content, self.theme);
                self.render_cache.insert(
                    message.id,
                    CachedRender {
                        content_len: message.content.len(),
                        lines,
                    },
                );
            }
        } else {
            let stale = self
                .render_cache
                .get(&message.id)
                .is_none_or(|c| c.content_len != message.content.len());
            if stale {
                let lines = render_message(&message.content, self.theme);
                self.render_cache.insert(
                    message.id,
                    CachedRender {
                        content_len: message.content.len(),
                        lines,
                    },
                );
            }
        }
        self.render_cache
            .get(&message.id)
            .map(|c| c.lines.clone())
            .unwrap_or_default()
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect, message: &str) {
        let lines = vec![
            Line::from(Span::styled(format!("✗ {message}"), self.theme.error())),
            Line::from(Span::styled(
                "Check your API settings (Ctrl+O) and resubmit.",
                self.theme.dim(),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }

    fn render_composer(&self, frame: &mut Frame, area: Rect) {
        let (before, after) = self.composer.split_at_cursor();
        let mut spans = Vec::new();
        spans.push(Span::styled(before.to_string(), self.theme.text()));
        spans.push(Span::styled("▏".to_string(), self.theme.dim()));
        spans.push(Span::styled(after.to_string(), self.theme.text()));

        let block = Block::default()
            .borders(Borders::TOP)
            .style(self.theme.text());
        frame.render_widget(
            Paragraph::new(Line::from(spans))
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let left = if let Some(flash) = self.flash {
            flash.to_string()
        } else if self.session.is_loading() {
            "Esc cancel · streaming…".to_string()
        } else {
            "Enter send · Ctrl+J newline · Ctrl+N new · Ctrl+H history · Ctrl+O settings · Ctrl+T theme · Ctrl+Y copy".to_string()
        };
        let line = Line::from(vec![
            Span::styled(left, self.theme.dim()),
            Span::styled(format!("  [{}]", self.settings.model), self.theme.dim()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
