use quill_core::TurnId;

/// Decoded transport events forwarded from the per-turn task to the UI loop,
/// tagged with the turn they belong to. The session discards stale turn ids,
/// so a superseded task can never mutate the conversation.
#[derive(Debug)]
pub(crate) enum AppEvent {
    StreamDelta { turn: TurnId, delta: String },
    StreamCompleted { turn: TurnId },
    StreamFailed { turn: TurnId, message: String },
}
