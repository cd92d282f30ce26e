//! Resilient LLM invocation layer.
//!
//! Wraps outbound chat-completion calls with retry and circuit breaking and
//! translates provider failures into a closed error taxonomy.
//!
//! # Call Path
//!
//! ```text
//! GenerationClient::chat_with_history
//!   → PromptAssembler::assemble         (system, history..., user)
//!   → RetryPolicy::run                  (bounded exponential backoff)
//!       → CircuitBreaker::call          (gate + outcome recording, per attempt)
//!           → ChatProvider::complete    (one HTTP call)
//!           → classify                  (ProviderError → LlmError)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use memocha::config::MemochaConfig;
//! use memocha::llm::GenerationClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MemochaConfig::default();
//! let client = GenerationClient::from_config(&config, reqwest::Client::new());
//! let reply = client.chat("Hello!", None).await?;
//! println!("{}", reply);
//! # Ok(())
//! # }
//! ```

pub mod breaker;
pub mod client;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod provider;
pub mod retry;

pub use breaker::{CircuitBreaker, CircuitState, Permit, DEFAULT_EXCLUDED_KINDS};
pub use client::{GenerationClient, GenerationSettings, EMPTY_RESPONSE_FALLBACK};
pub use error::{ErrorKind, LlmError};
pub use openai::OpenAiProvider;
pub use prompt::{ConversationTurn, HistoryEntry, PromptAssembler, Role, BASE_SYSTEM_PROMPT};
pub use provider::{classify, ChatProvider, CompletionRequest, ProviderError};
pub use retry::RetryPolicy;

use crate::config::MemochaConfig;
use std::sync::Arc;

impl GenerationClient {
    /// Build the production client: OpenAI provider, breaker and retry
    /// policy all taken from configuration.
    pub fn from_config(config: &MemochaConfig, http_client: reqwest::Client) -> Self {
        let provider = OpenAiProvider::new(
            config.llm.base_url.clone(),
            config.llm.api_key.clone(),
            http_client,
        );
        Self::with_provider(config, Arc::new(provider))
    }

    /// Build a client around any provider, with breaker, retry and prompt
    /// settings from configuration.
    pub fn with_provider(config: &MemochaConfig, provider: Arc<dyn ChatProvider>) -> Self {
        GenerationClient::new(
            GenerationSettings::from(&config.llm),
            provider,
            Arc::new(CircuitBreaker::new(&config.circuit_breaker)),
            RetryPolicy::new(&config.retry),
            PromptAssembler::new(config.llm.system_prompt.clone()),
        )
    }
}
