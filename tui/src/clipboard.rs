/// Copy `text` to the system clipboard. A failure is logged but never
/// surfaced as a conversation error; returns whether the copy succeeded so
/// the caller can flash a confirmation.
pub(crate) fn copy_to_clipboard(text: &str) -> bool {
    match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.to_string())) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("failed to copy to clipboard: {e}");
            false
        }
    }
}
