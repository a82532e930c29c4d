//! Transport, conversation state, and persistence for the Quill chat client.
//!
//! The interactive surface lives in the `quill-tui` crate; everything here is
//! UI-agnostic so the streaming pipeline and the turn state machine can be
//! exercised directly in tests.

mod client;
mod client_common;
pub mod config;
mod error;
pub mod flags;
pub mod history;
mod message;
mod session;
mod streaming;

pub use client::ModelClient;
pub use client_common::Prompt;
pub use client_common::ResponseEvent;
pub use client_common::ResponseStream;
pub use error::QuillErr;
pub use error::Result;
pub use message::Message;
pub use message::Role;
pub use session::ChatSession;
pub use session::TurnId;
pub use session::TurnStart;
pub use session::TurnPhase;
pub use streaming::StreamCursor;
