//! LLM provider configuration

use crate::llm::openai::DEFAULT_BASE_URL;
use crate::llm::BASE_SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generation provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// API credential; usually supplied via `OPENAI_API_KEY`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub system_prompt: String,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-nano".to_string(),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_seconds: 30,
            system_prompt: BASE_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}
