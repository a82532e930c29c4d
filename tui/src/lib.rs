// Forbid accidental stdout/stderr writes from the library portion of the
// TUI; anything printed while the alternate screen is active corrupts the
// display. Log through `tracing` instead.
#![deny(clippy::print_stdout, clippy::print_stderr)]

use quill_core::config::Settings;
use quill_core::config::ThemePrefs;
use quill_core::config::log_dir;
use quill_core::config::quill_home;
use quill_core::history::HistoryStore;
use tracing_appender::non_blocking;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod app;
mod app_event;
mod app_event_sender;
mod chatwidget;
mod cli;
mod clipboard;
mod composer;
mod history_panel;
mod markdown;
mod settings_panel;
mod theme;
mod tui;

pub use cli::Cli;

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let home = quill_home()?;

    // Route logs to ~/.quill/log/quill-tui.log; nothing may write to the
    // terminal while the alternate screen is up.
    std::fs::create_dir_all(log_dir(&home))?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir(&home).join("quill-tui.log"))?;
    let (writer, _guard) = non_blocking(log_file);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quill_core=info,quill_tui=info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter),
        )
        .init();

    let mut settings = Settings::load(&home);
    if let Some(model) = cli.model {
        settings.model = model;
    }
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    let theme_prefs = ThemePrefs::load(&home);
    let history = HistoryStore::load(&home);

    let mut terminal = tui::init()?;
    let result = app::App::new(home, settings, theme_prefs, history)
        .run(&mut terminal)
        .await;
    tui::restore()?;
    result
}
