//! Session-scoped state: chat history and the uploaded-text cache.
//!
//! One [`SessionState`] per interactive session, passed explicitly to the
//! pipelines. Nothing here is process-global, so a multi-session embedding
//! of this crate scopes state per connection for free.

use std::collections::HashMap;

use crate::models::{ChatRole, ChatTurn};

#[derive(Debug, Default)]
pub struct SessionState {
    /// Append-only chat transcript; cleared only by dropping the session.
    history: Vec<ChatTurn>,
    /// Filename → full raw uploaded text, last write wins per filename.
    text_cache: HashMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the full raw text of an upload under its filename.
    pub fn cache_text(&mut self, filename: &str, raw_text: &str) {
        self.text_cache
            .insert(filename.to_string(), raw_text.to_string());
    }

    /// Look up line `line_index` of the cached text for `filename`, indexing
    /// the unfiltered newline split. `None` when the file is not cached or
    /// the index is out of range.
    pub fn cached_line(&self, filename: &str, line_index: usize) -> Option<&str> {
        let raw = self.text_cache.get(filename)?;
        raw.split('\n').nth(line_index)
    }

    pub fn push_user(&mut self, content: &str) {
        self.history.push(ChatTurn {
            role: ChatRole::User,
            content: content.to_string(),
        });
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.history.push(ChatTurn {
            role: ChatRole::Assistant,
            content: content.to_string(),
        });
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_line_lookup() {
        let mut session = SessionState::new();
        session.cache_text("notes.txt", "apple\n\nbanana");
        assert_eq!(session.cached_line("notes.txt", 0), Some("apple"));
        assert_eq!(session.cached_line("notes.txt", 1), Some(""));
        assert_eq!(session.cached_line("notes.txt", 2), Some("banana"));
        assert_eq!(session.cached_line("notes.txt", 3), None);
    }

    #[test]
    fn test_missing_file_returns_none() {
        let session = SessionState::new();
        assert_eq!(session.cached_line("ghost.txt", 0), None);
    }

    #[test]
    fn test_recache_overwrites() {
        // Two sequential uploads to the same filename: only the latest
        // content is visible afterwards.
        let mut session = SessionState::new();
        session.cache_text("notes.txt", "old contents");
        session.cache_text("notes.txt", "new contents");
        assert_eq!(session.cached_line("notes.txt", 0), Some("new contents"));
    }

    #[test]
    fn test_history_appends_in_order() {
        let mut session = SessionState::new();
        session.push_user("hello");
        session.push_assistant("hi there");
        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].role, ChatRole::Assistant);
        assert_eq!(history[1].content, "hi there");
    }
}
