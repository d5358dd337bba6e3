//! Request orchestration for a single conversation.
//!
//! A submission moves `Idle -> Sending -> Idle`. At most one request is in
//! flight; anything submitted meanwhile is dropped. The user's question is
//! recorded before the remote call starts, the answer (or an error message)
//! after it resolves.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ai::{GenerateError, GenerateResult, Generator};
use crate::prompt::build_prompt;
use crate::state::{ChatMessage, ChatRole, ContextEntry};
use crate::store::ConversationStore;

pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "API key not configured. Please add GEMINI_API_KEY to your .env file.";

const ERROR_PREFIX: &str = "Sorry, I encountered an error. ";

/// Result of [`ChatSession::begin`].
pub enum Submission {
    /// Blank input; nothing happened.
    Empty,
    /// Another request is still running; nothing happened.
    Busy,
    /// No API key; an explanatory assistant message was appended.
    MissingCredential,
    /// The question was recorded and the request is ready to send.
    Pending(PendingRequest),
}

/// A request that has been accepted but not yet sent.
pub struct PendingRequest {
    question: String,
    prompt: String,
    model: String,
    generator: Arc<dyn Generator>,
}

impl PendingRequest {
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Perform the remote call. Always resolves; failures are carried in the
    /// returned [`Exchange`].
    pub async fn send(self) -> Exchange {
        let outcome = self.generator.generate(&self.model, &self.prompt).await;
        Exchange {
            question: self.question,
            outcome,
        }
    }
}

/// A finished round trip, ready to be applied with [`ChatSession::complete`].
#[derive(Debug)]
pub struct Exchange {
    pub question: String,
    pub outcome: GenerateResult<String>,
}

/// Result of the one-shot [`ChatSession::submit`].
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Empty,
    Busy,
    MissingCredential,
    Answered,
    Failed(GenerateError),
}

pub struct ChatSession {
    store: ConversationStore,
    generator: Option<Arc<dyn Generator>>,
    model: String,
    in_flight: bool,
}

impl ChatSession {
    /// `generator` is `None` when no API key is configured.
    pub fn new(
        store: ConversationStore,
        generator: Option<Arc<dyn Generator>>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            generator,
            model: model.into(),
            in_flight: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.store.messages()
    }

    pub fn context(&self) -> &[ContextEntry] {
        self.store.context()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn has_credential(&self) -> bool {
        self.generator.is_some()
    }

    /// Validate and record a question. On [`Submission::Pending`] the session
    /// is marked in flight until [`ChatSession::complete`] is called.
    pub fn begin(&mut self, question: &str) -> Submission {
        let question = question.trim();
        if question.is_empty() {
            return Submission::Empty;
        }
        if self.in_flight {
            debug!("request already in flight, dropping submission");
            return Submission::Busy;
        }

        let Some(generator) = self.generator.clone() else {
            warn!("no API key configured");
            self.store
                .append_message(ChatRole::Assistant, MISSING_CREDENTIAL_MESSAGE);
            return Submission::MissingCredential;
        };

        self.store.append_message(ChatRole::User, question);
        let prompt = build_prompt(self.store.context(), question);
        self.in_flight = true;

        info!(model = %self.model, context = self.store.context().len(), "sending question");

        Submission::Pending(PendingRequest {
            question: question.to_string(),
            prompt,
            model: self.model.clone(),
            generator,
        })
    }

    /// Apply the result of a request and return to idle.
    pub fn complete(&mut self, exchange: Exchange) {
        match exchange.outcome {
            Ok(answer) => {
                info!(answer_len = answer.len(), "received answer");
                self.store.append_message(ChatRole::Assistant, answer.clone());
                self.store.append_context(exchange.question, answer);
            }
            Err(e) => {
                warn!(error = %e, "request failed");
                self.store
                    .append_message(ChatRole::Assistant, failure_message(&e));
            }
        }
        self.in_flight = false;
    }

    /// Run one submission to completion.
    pub async fn submit(&mut self, question: &str) -> SubmitOutcome {
        let request = match self.begin(question) {
            Submission::Empty => return SubmitOutcome::Empty,
            Submission::Busy => return SubmitOutcome::Busy,
            Submission::MissingCredential => return SubmitOutcome::MissingCredential,
            Submission::Pending(request) => request,
        };

        let exchange = request.send().await;
        let outcome = match &exchange.outcome {
            Ok(_) => SubmitOutcome::Answered,
            Err(e) => SubmitOutcome::Failed(e.clone()),
        };
        self.complete(exchange);
        outcome
    }
}

/// User-facing text for a failed request.
pub fn failure_message(error: &GenerateError) -> String {
    let detail = match error {
        GenerateError::InvalidCredential(_) => {
            "Invalid API key. Please check your Gemini API key.".to_string()
        }
        GenerateError::QuotaExceeded(_) => "API quota exceeded. Please try again later.".to_string(),
        GenerateError::Other(description) if description.trim().is_empty() => {
            "Error: Unknown error".to_string()
        }
        GenerateError::Other(description) => format!("Error: {description}"),
    };
    format!("{ERROR_PREFIX}{detail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_messages_by_kind() {
        assert_eq!(
            failure_message(&GenerateError::InvalidCredential("bad".into())),
            "Sorry, I encountered an error. Invalid API key. Please check your Gemini API key."
        );
        assert_eq!(
            failure_message(&GenerateError::QuotaExceeded("429".into())),
            "Sorry, I encountered an error. API quota exceeded. Please try again later."
        );
        assert_eq!(
            failure_message(&GenerateError::Other("connection reset".into())),
            "Sorry, I encountered an error. Error: connection reset"
        );
        assert_eq!(
            failure_message(&GenerateError::Other(String::new())),
            "Sorry, I encountered an error. Error: Unknown error"
        );
    }
}
