/// Tracks how much of a streaming message's authoritative content has already
/// been handed to the renderer, so each update only yields the newly-arrived
/// suffix instead of re-rendering from scratch.
///
/// The authoritative content is monotonically non-decreasing in length while
/// a stream is active; historical and user messages bypass the cursor
/// entirely and are displayed verbatim.
#[derive(Debug, Default, Clone)]
pub struct StreamCursor {
    committed: usize,
}

impl StreamCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the suffix of `content` that has not been committed yet and
    /// advance the cursor to the new total length. Idempotent for unchanged
    /// content: repeated calls return the empty string.
    pub fn advance<'a>(&mut self, content: &'a str) -> &'a str {
        if content.len() < self.committed {
            // A shrinking stream violates the monotonicity invariant; reset
            // rather than slicing out of bounds.
            debug_assert!(false, "streaming content shrank mid-stream");
            self.committed = 0;
        }
        let new = &content[self.committed..];
        self.committed = content.len();
        new
    }

    /// Number of bytes already committed to the display.
    pub fn committed(&self) -> usize {
        self.committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_only_the_new_suffix() {
        let mut cursor = StreamCursor::new();
        assert_eq!(cursor.advance("Hel"), "Hel");
        assert_eq!(cursor.advance("Hello, wor"), "lo, wor");
        assert_eq!(cursor.advance("Hello, world"), "ld");
    }

    #[test]
    fn idempotent_when_content_is_unchanged() {
        let mut cursor = StreamCursor::new();
        assert_eq!(cursor.advance("abc"), "abc");
        assert_eq!(cursor.advance("abc"), "");
        assert_eq!(cursor.advance("abc"), "");
        assert_eq!(cursor.committed(), 3);
    }

    #[test]
    fn empty_content_yields_nothing() {
        let mut cursor = StreamCursor::new();
        assert_eq!(cursor.advance(""), "");
        assert_eq!(cursor.committed(), 0);
    }
}
