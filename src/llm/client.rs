//! Generation client: the guarded call path to the provider.

use super::breaker::CircuitBreaker;
use super::error::LlmError;
use super::prompt::{ConversationTurn, HistoryEntry, PromptAssembler};
use super::provider::{classify, ChatProvider, CompletionRequest};
use super::retry::RetryPolicy;
use crate::config::LlmConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Returned instead of blank provider output.
pub const EMPTY_RESPONSE_FALLBACK: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

/// Immutable generation parameters sent with every call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        }
    }
}

/// Facade over provider, breaker and retry policy.
///
/// Built once at startup and shared as `Arc<GenerationClient>` by every
/// request handler. Configuration is read-only after construction; the
/// breaker is the only mutable state and synchronises itself.
///
/// Guarded call path: `retry(breaker(provider ∘ classify))`. Each retry
/// attempt passes the breaker gate, so an open breaker ends the sequence
/// immediately with `ServiceUnavailable`.
pub struct GenerationClient {
    settings: GenerationSettings,
    provider: Arc<dyn ChatProvider>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    assembler: PromptAssembler,
}

impl GenerationClient {
    pub fn new(
        settings: GenerationSettings,
        provider: Arc<dyn ChatProvider>,
        breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        assembler: PromptAssembler,
    ) -> Self {
        Self {
            settings,
            provider,
            breaker,
            retry,
            assembler,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Single-turn chat: system prompt + one user message.
    pub async fn chat(
        &self,
        user_message: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let turns = self.assembler.assemble(system_prompt, &[], user_message);
        self.generate(turns).await
    }

    /// Chat with prior turns. `history` must already be bounded by the caller
    /// and must not contain `user_message`.
    pub async fn chat_with_history(
        &self,
        user_message: &str,
        history: &[HistoryEntry],
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let turns = self.assembler.assemble(system_prompt, history, user_message);
        self.generate(turns).await
    }

    async fn generate(&self, messages: Vec<ConversationTurn>) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            timeout: self.settings.timeout,
        };

        let start = Instant::now();
        let result = self
            .retry
            .run_gated(
                || self.breaker.call(|| self.invoke(&request)),
                || !self.breaker.is_rejecting(),
            )
            .await;
        let elapsed = start.elapsed();

        match result {
            Ok(text) if text.trim().is_empty() => {
                warn!(provider = self.provider.name(), "Received empty response from LLM");
                crate::metrics::record_llm_request("empty", elapsed);
                Ok(EMPTY_RESPONSE_FALLBACK.to_string())
            }
            Ok(text) => {
                crate::metrics::record_llm_request("success", elapsed);
                Ok(text)
            }
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    kind = %e.kind(),
                    error = %e,
                    "LLM call failed"
                );
                crate::metrics::record_llm_request("error", elapsed);
                crate::metrics::record_llm_error(e.kind().as_str());
                Err(e)
            }
        }
    }

    /// One raw provider call with taxonomy mapping.
    async fn invoke(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(
            provider = self.provider.name(),
            model = %request.model,
            turns = request.messages.len(),
            "Invoking LLM provider"
        );
        self.provider.complete(request).await.map_err(classify)
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("settings", &self.settings)
            .field("provider", &self.provider.name())
            .field("retry", &self.retry)
            .finish()
    }
}
