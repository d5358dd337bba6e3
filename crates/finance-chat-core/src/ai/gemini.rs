use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerateError, GenerateResult, Generator};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorWrapper {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: Option<String>,
    status: Option<String>,
    #[serde(default)]
    details: Vec<GeminiErrorDetail>,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    reason: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn query(&self, model: &str, prompt: &str) -> GenerateResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(model = %model, prompt_len = prompt.len(), "sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerateError::Other(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Other(format!("Failed to parse Gemini response: {e}")))?;

        extract_text(gemini_response)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> GenerateResult<String> {
        self.query(model, prompt).await
    }
}

fn extract_text(response: GeminiResponse) -> GenerateResult<String> {
    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GenerateError::Other(
            "Gemini returned no text in the response".to_string(),
        ));
    }

    Ok(text)
}

/// Map a non-success Gemini response onto the error kinds the chat cares about.
fn classify_error(status: StatusCode, body: &str) -> GenerateError {
    let parsed = serde_json::from_str::<GeminiErrorWrapper>(body).ok();

    let (message, error_status, reasons) = match parsed {
        Some(wrapper) => {
            let reasons: Vec<String> = wrapper
                .error
                .details
                .into_iter()
                .filter_map(|d| d.reason)
                .collect();
            (
                wrapper.error.message.unwrap_or_else(|| body.to_string()),
                wrapper.error.status.unwrap_or_default(),
                reasons,
            )
        }
        None => (body.to_string(), String::new(), Vec::new()),
    };

    let description = if message.trim().is_empty() {
        format!("Gemini API error {status}")
    } else if error_status.is_empty() {
        format!("[{status}] {message}")
    } else {
        format!("[{status} {error_status}] {message}")
    };

    let has_marker = |marker: &str| reasons.iter().any(|r| r == marker) || body.contains(marker);

    if has_marker("API_KEY_INVALID") {
        GenerateError::InvalidCredential(description)
    } else if has_marker("QUOTA_EXCEEDED")
        || error_status == "RESOURCE_EXHAUSTED"
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        GenerateError::QuotaExceeded(description)
    } else {
        GenerateError::Other(description)
    }
}
