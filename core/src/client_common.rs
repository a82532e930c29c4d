use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use futures::Stream;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::message::Message;

/// Request payload for a single model turn: the ordered prior messages,
/// including the just-submitted user message.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub messages: Vec<Message>,
}

impl Prompt {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// Events decoded from the wire framing. The rest of the pipeline stays
/// agnostic of the underlying SSE format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// An incremental fragment of assistant text, in arrival order.
    OutputTextDelta(String),
    /// End of stream; `content` is the concatenation of every delta.
    Completed { content: String },
}

#[derive(Debug)]
pub struct ResponseStream {
    pub(crate) rx_event: mpsc::Receiver<Result<ResponseEvent>>,
}

impl Stream for ResponseStream {
    type Item = Result<ResponseEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx_event.poll_recv(cx)
    }
}
