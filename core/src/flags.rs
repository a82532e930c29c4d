use std::time::Duration;

use env_flags::env_flags;

env_flags! {
    pub QUILL_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
    pub QUILL_DEFAULT_MODEL: &str = "gpt-3.5-turbo";

    /// How long the SSE decoder waits between chunks before giving up on the
    /// stream. Matches the upstream five-minute request timeout.
    pub QUILL_STREAM_IDLE_TIMEOUT_MS: Duration = Duration::from_millis(300_000), |value| {
        value.parse().map(Duration::from_millis)
    };
}
