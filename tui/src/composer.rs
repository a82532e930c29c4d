/// Multi-line input state for the message composer. Enter submits; Ctrl+J
/// inserts a newline; bracketed paste lands verbatim.
#[derive(Debug, Default)]
pub(crate) struct Composer {
    text: String,
    /// Byte offset of the cursor; always on a char boundary.
    cursor: usize,
}

impl Composer {
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Clear and return the current contents.
    pub(crate) fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub(crate) fn insert_char(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub(crate) fn insert_str(&mut self, s: &str) {
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
    }

    pub(crate) fn newline(&mut self) {
        self.insert_char('\n');
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.text.remove(prev);
            self.cursor = prev;
        }
    }

    pub(crate) fn move_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    pub(crate) fn move_right(&mut self) {
        if let Some(c) = self.text[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub(crate) fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Text split at the cursor, for rendering a visible caret.
    pub(crate) fn split_at_cursor(&self) -> (&str, &str) {
        self.text.split_at(self.cursor)
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor].char_indices().last().map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_and_backspace_respect_char_boundaries() {
        let mut composer = Composer::default();
        composer.insert_str("héllo");
        composer.move_left();
        composer.move_left();
        composer.backspace();
        assert_eq!(composer.text(), "hélo");

        composer.move_home();
        composer.move_right();
        composer.backspace();
        assert_eq!(composer.text(), "élo");
    }

    #[test]
    fn take_clears_text_and_cursor() {
        let mut composer = Composer::default();
        composer.insert_str("2+2?");
        assert_eq!(composer.take(), "2+2?");
        assert!(composer.is_empty());
        composer.insert_char('x');
        assert_eq!(composer.text(), "x");
    }

    #[test]
    fn whitespace_only_input_counts_as_empty() {
        let mut composer = Composer::default();
        composer.insert_str("  \n\t ");
        assert!(composer.is_empty());
    }
}
