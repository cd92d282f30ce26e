//! OpenAI-compatible chat-completion provider.

use super::prompt::ConversationTurn;
use super::provider::{ChatProvider, CompletionRequest, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI provider.
///
/// Calls `POST {base_url}/v1/chat/completions` with Bearer authentication.
/// The reqwest client is shared for connection pooling; the timeout is set
/// per request from [`CompletionRequest::timeout`].
pub struct OpenAiProvider {
    /// Base URL (e.g., "https://api.openai.com")
    base_url: String,
    /// API key for Bearer authentication
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, client: Client) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Request body for /v1/chat/completions
#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ConversationTurn],
    temperature: f32,
    max_tokens: u32,
}

/// Response body from /v1/chat/completions (fields we read)
#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI error envelope: `{"error": {"message": ...}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Prefer the envelope's message; fall back to the raw body.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body.to_string(),
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let timeout_ms = request.timeout.as_millis() as u64;

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(timeout_ms)
                } else {
                    ProviderError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                status.as_u16(),
                error_message(&error_body, status),
            ));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(timeout_ms)
            } else {
                ProviderError::Decode(format!("Failed to parse completion response: {}", e))
            }
        })?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
