//! Persistence for archived conversations.
//!
//! History is stored at `~/.quill/history.jsonl` with one JSON-encoded
//! conversation (an array of messages) per line, so archiving is a single
//! append and the file stays parseable with standard JSON-Lines tooling.
//! Archived conversations are immutable snapshots; delete and clear rewrite
//! the file through a temp-file + rename.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::error::Result;
use crate::message::Message;

const HISTORY_FILENAME: &str = "history.jsonl";

/// How many characters of the first message to show in history lists.
const PREVIEW_LEN: usize = 50;

#[derive(Debug, Default)]
pub struct HistoryStore {
    path: PathBuf,
    conversations: Vec<Vec<Message>>,
}

impl HistoryStore {
    /// Load the archive from `home`, skipping unparseable lines rather than
    /// failing the whole load.
    pub fn load(home: &Path) -> Self {
        let path = home.join(HISTORY_FILENAME);
        let conversations = match std::fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| match serde_json::from_str(line) {
                    Ok(convo) => Some(convo),
                    Err(e) => {
                        tracing::warn!("skipping corrupt history line: {e}");
                        None
                    }
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        Self {
            path,
            conversations,
        }
    }

    pub fn conversations(&self) -> &[Vec<Message>] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Archive one conversation. The new line is written with a single
    /// `write` on a file opened with `O_APPEND`.
    pub fn append(&mut self, conversation: Vec<Message>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(&conversation)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        self.conversations.push(conversation);
        Ok(())
    }

    /// Remove the conversation at `index`. Out-of-range indices are a no-op.
    pub fn delete(&mut self, index: usize) -> Result<()> {
        if index >= self.conversations.len() {
            return Ok(());
        }
        self.conversations.remove(index);
        self.rewrite()
    }

    /// Drop the entire archive.
    pub fn clear(&mut self) -> Result<()> {
        self.conversations.clear();
        self.rewrite()
    }

    /// A snapshot of the conversation at `index` for restoring into the live
    /// session.
    pub fn get(&self, index: usize) -> Option<Vec<Message>> {
        self.conversations.get(index).cloned()
    }

    /// Leading characters of the first message, for list rendering.
    pub fn preview(&self, index: usize) -> String {
        let Some(first) = self
            .conversations
            .get(index)
            .and_then(|convo| convo.first())
        else {
            return String::new();
        };
        let mut preview: String = first.content.chars().take(PREVIEW_LEN).collect();
        if first.content.chars().count() > PREVIEW_LEN {
            preview.push('…');
        }
        preview
    }

    fn rewrite(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut contents = String::new();
        for convo in &self.conversations {
            contents.push_str(&serde_json::to_string(convo)?);
            contents.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::message::Role;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn convo(user: &str, assistant: &str) -> Vec<Message> {
        vec![Message::user(user), Message::new(Role::Assistant, assistant)]
    }

    #[test]
    fn append_persists_across_reload() {
        let home = TempDir::new().unwrap();
        let mut store = HistoryStore::load(home.path());
        store.append(convo("2+2?", "4")).unwrap();
        store.append(convo("hello", "hi there")).unwrap();

        let reloaded = HistoryStore::load(home.path());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.conversations()[0][1].content, "4");
        assert_eq!(reloaded.conversations()[1][0].content, "hello");
    }

    #[test]
    fn delete_by_index_and_clear_all() {
        let home = TempDir::new().unwrap();
        let mut store = HistoryStore::load(home.path());
        store.append(convo("a", "1")).unwrap();
        store.append(convo("b", "2")).unwrap();
        store.append(convo("c", "3")).unwrap();

        store.delete(1).unwrap();
        let reloaded = HistoryStore::load(home.path());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.conversations()[1][0].content, "c");

        // Deleting past the end is a no-op.
        store.delete(99).unwrap();
        assert_eq!(store.len(), 2);

        store.clear().unwrap();
        assert!(HistoryStore::load(home.path()).is_empty());
    }

    #[test]
    fn corrupt_lines_are_skipped_on_load() {
        let home = TempDir::new().unwrap();
        let mut store = HistoryStore::load(home.path());
        store.append(convo("kept", "yes")).unwrap();

        let path = home.path().join(HISTORY_FILENAME);
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{this is not json\n");
        std::fs::write(&path, contents).unwrap();

        let reloaded = HistoryStore::load(home.path());
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.preview(0), "kept");
    }

    #[test]
    fn preview_truncates_long_first_messages() {
        let home = TempDir::new().unwrap();
        let mut store = HistoryStore::load(home.path());
        let long = "x".repeat(80);
        store.append(convo(&long, "ok")).unwrap();

        let preview = store.preview(0);
        assert_eq!(preview.chars().count(), PREVIEW_LEN + 1);
        assert!(preview.ends_with('…'));
    }
}
