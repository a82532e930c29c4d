use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::client_common::Prompt;
use crate::message::Message;

/// Identifies one submission. Ids are monotonically increasing; events
/// carrying a stale id are discarded, which guarantees that no late delta can
/// mutate a conversation after its request was superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnId(u64);

/// Lifecycle of the outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

/// Everything the transport task needs to run one turn.
#[derive(Debug)]
pub struct TurnStart {
    pub id: TurnId,
    pub prompt: Prompt,
    pub cancel: CancellationToken,
    pub placeholder: Uuid,
}

#[derive(Debug)]
struct ActiveTurn {
    id: TurnId,
    placeholder: Uuid,
    cancel: CancellationToken,
}

/// The live conversation and its per-turn state machine. All methods are
/// synchronous state transitions; the async transport plumbing lives with the
/// caller, which feeds decoded events back in tagged with their [`TurnId`].
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
    phase: TurnPhase,
    next_turn: u64,
    active: Option<ActiveTurn>,
    error: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit `input` as a new user message. Blank input is rejected without
    /// creating a message pair. A submission while a turn is in flight first
    /// cancels it, so at most one cancellation token is ever live.
    ///
    /// On success the user message and an empty placeholder assistant message
    /// have been appended atomically, and the returned [`TurnStart`] carries
    /// the prompt (prior messages plus the new user message, placeholder
    /// excluded) for the transport task.
    pub fn begin_turn(&mut self, input: &str) -> Option<TurnStart> {
        if input.trim().is_empty() {
            return None;
        }

        self.cancel_turn();
        self.error = None;

        self.messages.push(Message::user(input));
        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id;
        self.messages.push(placeholder);

        let prompt = Prompt::new(
            self.messages[..self.messages.len() - 1].to_vec(),
        );

        self.next_turn += 1;
        let id = TurnId(self.next_turn);
        let cancel = CancellationToken::new();
        self.active = Some(ActiveTurn {
            id,
            placeholder: placeholder_id,
            cancel: cancel.clone(),
        });
        self.phase = TurnPhase::Sending;

        Some(TurnStart {
            id,
            prompt,
            cancel,
            placeholder: placeholder_id,
        })
    }

    /// Append one streamed fragment to the placeholder. The first delta moves
    /// the turn from `Sending` to `Streaming`. Stale turns are ignored.
    pub fn apply_delta(&mut self, turn: TurnId, delta: &str) {
        let Some(active) = self.active.as_ref().filter(|a| a.id == turn) else {
            debug!("discarding delta for stale turn {turn:?}");
            return;
        };
        self.phase = TurnPhase::Streaming;
        let placeholder = active.placeholder;
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == placeholder) {
            msg.content.push_str(delta);
        }
    }

    /// Finalize a successful turn. A stream that completed without producing
    /// any content is converted into a failure so the user is never shown a
    /// silent empty message.
    pub fn complete_turn(&mut self, turn: TurnId) {
        let Some(active) = self.active.as_ref().filter(|a| a.id == turn) else {
            return;
        };
        let placeholder = active.placeholder;
        let empty = self
            .messages
            .iter()
            .find(|m| m.id == placeholder)
            .is_none_or(|m| m.content.is_empty());
        if empty {
            self.fail_turn(turn, "model returned an empty response");
            return;
        }
        self.active = None;
        self.phase = TurnPhase::Completed;
    }

    /// Record a failed turn: the placeholder is removed from the conversation
    /// (never shown half-formed alongside an error) and exactly one error
    /// message is surfaced.
    pub fn fail_turn(&mut self, turn: TurnId, message: impl Into<String>) {
        let Some(active) = self.active.take_if(|a| a.id == turn) else {
            return;
        };
        self.messages.retain(|m| m.id != active.placeholder);
        self.error = Some(message.into());
        self.phase = TurnPhase::Failed;
    }

    /// Cooperatively cancel the in-flight turn, if any. An empty placeholder
    /// is discarded; one that already received content is kept, frozen at
    /// whatever arrived. No error is surfaced.
    pub fn cancel_turn(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();
        self.messages
            .retain(|m| m.id != active.placeholder || !m.content.is_empty());
        self.phase = TurnPhase::Cancelled;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// True from submission until the turn completes, fails, or is cancelled.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, TurnPhase::Sending | TurnPhase::Streaming)
    }

    /// Id of the assistant message currently receiving deltas, if any.
    pub fn streaming_message_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|a| a.placeholder)
    }

    pub fn surfaced_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Archive the current conversation: cancels any in-flight turn and
    /// returns the message list, leaving the session idle and empty. Returns
    /// `None` when there is nothing to archive.
    pub fn take_conversation(&mut self) -> Option<Vec<Message>> {
        self.cancel_turn();
        self.phase = TurnPhase::Idle;
        self.error = None;
        if self.messages.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.messages))
    }

    /// Replace the live conversation with an archived snapshot.
    pub fn restore(&mut self, messages: Vec<Message>) {
        self.cancel_turn();
        self.phase = TurnPhase::Idle;
        self.error = None;
        self.messages = messages;
    }
}
