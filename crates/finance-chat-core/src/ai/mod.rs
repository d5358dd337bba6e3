pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a remote model, already classified by the client that
/// talked to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("invalid API credential: {0}")]
    InvalidCredential(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    Other(String),
}

pub type GenerateResult<T> = Result<T, GenerateError>;

/// A remote text-generation capability: one prompt in, one completion out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> GenerateResult<String>;
}
