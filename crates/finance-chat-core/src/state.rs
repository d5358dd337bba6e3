//! UI-agnostic conversation state types
//!
//! These structures are shared between the conversation store, the request
//! orchestrator and any front end. Their serialized form is the persisted
//! snapshot, so field names are part of the on-disk contract.

use serde::{Deserialize, Serialize};

/// Opening message shown when there is no saved conversation.
pub const GREETING: &str = "Hi! I'm your finance assistant. Ask me anything about personal finance, investing, budgeting, or financial planning.";

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One completed question/answer pair, fed back to the model as short-term memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub question: String,
    pub answer: String,
}

/// Everything that is persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub context: Vec<ContextEntry>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl SessionState {
    /// Fresh conversation containing only the greeting.
    pub fn with_greeting() -> Self {
        Self {
            context: Vec::new(),
            messages: vec![ChatMessage::assistant(GREETING)],
        }
    }
}
