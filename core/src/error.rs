use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuillErr>;

#[derive(Debug, Error)]
pub enum QuillErr {
    /// Settings are incomplete; raised before any network I/O is attempted.
    #[error("missing configuration: {0} is not set")]
    MissingConfiguration(&'static str),

    /// Non-2xx response from the completion endpoint. `message` is the
    /// structured error message when the body carried one, otherwise a
    /// generic status-coded string.
    #[error("{message}")]
    UnexpectedStatus { status: StatusCode, message: String },

    /// The in-flight request was cancelled by its cancellation token. Never
    /// surfaced to the user as an error.
    #[error("request was cancelled")]
    Interrupted,

    /// The streaming body failed mid-flight (disconnect, idle timeout).
    #[error("stream disconnected before completion: {0}")]
    Stream(String),

    /// A success response whose body did not carry any message content.
    #[error("response did not contain any message content")]
    EmptyResponse,

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuillErr {
    /// Whether this failure is a cooperative cancellation whose effects
    /// should be silently discarded.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, QuillErr::Interrupted)
    }
}
