use std::path::PathBuf;

use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::event::KeyEventKind;
use futures::StreamExt;
use quill_core::config::Settings;
use quill_core::config::ThemePrefs;
use quill_core::history::HistoryStore;
use tokio::sync::mpsc;

use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::chatwidget::ChatWidget;
use crate::tui::Tui;

pub(crate) struct App {
    chat: ChatWidget,
    app_event_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    pub(crate) fn new(
        home: PathBuf,
        settings: Settings,
        theme_prefs: ThemePrefs,
        history: HistoryStore,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let chat = ChatWidget::new(home, settings, theme_prefs, history, AppEventSender::new(tx));
        Self {
            chat,
            app_event_rx: rx,
        }
    }

    /// Single-threaded cooperative event loop: terminal input and transport
    /// events are multiplexed onto one channel and applied in arrival order,
    /// with a redraw after each batch.
    pub(crate) async fn run(mut self, terminal: &mut Tui) -> anyhow::Result<()> {
        let mut terminal_events = EventStream::new();
        terminal.draw(|frame| self.chat.render(frame))?;

        while !self.chat.should_quit() {
            tokio::select! {
                Some(event) = terminal_events.next() => {
                    match event? {
                        Event::Key(key) if key.kind != KeyEventKind::Release => {
                            self.chat.handle_key(key);
                        }
                        Event::Paste(pasted) => self.chat.handle_paste(pasted),
                        // Resize triggers the redraw below; everything else
                        // is ignored.
                        _ => {}
                    }
                }
                Some(app_event) = self.app_event_rx.recv() => {
                    self.chat.handle_app_event(app_event);
                }
            }
            terminal.draw(|frame| self.chat.render(frame))?;
        }
        Ok(())
    }
}
