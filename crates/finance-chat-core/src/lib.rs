pub mod ai;
pub mod config;
pub mod prompt;
pub mod session;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use ai::{GeminiClient, GenerateError, Generator};
pub use config::Config;
pub use session::{ChatSession, Exchange, PendingRequest, SubmitOutcome, Submission};
pub use state::{ChatMessage, ChatRole, ContextEntry, SessionState};
pub use store::ConversationStore;
