use clap::Parser;

/// Terminal chat client for OpenAI-compatible completion endpoints.
#[derive(Parser, Debug, Default)]
#[command(name = "quill", version)]
pub struct Cli {
    /// Model to use for this session, overriding the saved settings.
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Completion endpoint URL for this session, overriding the saved
    /// settings.
    #[arg(long)]
    pub base_url: Option<String>,
}
