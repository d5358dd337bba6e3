//! Conversation store
//!
//! Owns the [`SessionState`] for the lifetime of the process and mirrors it
//! to a single JSON snapshot file. Every mutation rewrites the whole file.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::state::{ChatMessage, ChatRole, ContextEntry, SessionState};

pub struct ConversationStore {
    path: PathBuf,
    state: SessionState,
}

impl ConversationStore {
    /// Open the snapshot at `path`, falling back to a fresh greeting when the
    /// file is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = Self::load(&path);
        Self { path, state }
    }

    /// Read the persisted snapshot. Never fails: anything that cannot be read
    /// or parsed is treated as "no saved conversation".
    pub fn load(path: &Path) -> SessionState {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no saved conversation");
                return SessionState::with_greeting();
            }
        };

        match serde_json::from_str::<SessionState>(&content) {
            Ok(state) => {
                debug!(
                    messages = state.messages.len(),
                    context = state.context.len(),
                    "restored conversation"
                );
                state
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable conversation snapshot");
                SessionState::with_greeting()
            }
        }
    }

    /// Overwrite the snapshot with the full current state.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn append_message(&mut self, role: ChatRole, text: impl Into<String>) {
        self.state.messages.push(ChatMessage {
            role,
            text: text.into(),
        });
        self.persist();
    }

    pub fn append_context(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.state.context.push(ContextEntry {
            question: question.into(),
            answer: answer.into(),
        });
        self.persist();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.state.messages
    }

    pub fn context(&self) -> &[ContextEntry] {
        &self.state.context
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), error = %e, "failed to save conversation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GREETING;
    use tempfile::TempDir;

    #[test]
    fn missing_snapshot_starts_with_greeting() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::open(dir.path().join("chat.json"));

        assert_eq!(store.messages(), &[ChatMessage::assistant(GREETING)]);
        assert!(store.context().is_empty());
    }

    #[test]
    fn corrupt_snapshot_starts_with_greeting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.json");
        fs::write(&path, "{ not json").unwrap();

        let store = ConversationStore::open(&path);
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].text, GREETING);
    }

    #[test]
    fn appends_are_written_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("chat.json");

        let mut store = ConversationStore::open(&path);
        store.append_message(ChatRole::User, "How much should I save?");
        store.append_message(ChatRole::Assistant, "Start with 20%.");
        store.append_context("How much should I save?", "Start with 20%.");

        let reloaded = ConversationStore::open(&path);
        assert_eq!(reloaded.state(), store.state());
        assert_eq!(reloaded.messages().len(), 3);
        assert_eq!(reloaded.context().len(), 1);
    }

    #[test]
    fn save_then_reload_is_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.json");

        let mut store = ConversationStore::open(&path);
        for i in 0..7 {
            store.append_message(ChatRole::User, format!("q{i}"));
            store.append_message(ChatRole::Assistant, format!("a{i}"));
            store.append_context(format!("q{i}"), format!("a{i}"));
        }
        store.save().unwrap();

        let reloaded = ConversationStore::open(&path);
        assert_eq!(reloaded.messages(), store.messages());
        assert_eq!(reloaded.context(), store.context());
        assert_eq!(reloaded.context().len(), 7);
    }
}
