//! Configuration module for Memocha
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`MEMOCHA_*`, `OPENAI_*`, `LLM_*`, `BASE_SYSTEM_PROMPT`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use memocha::config::MemochaConfig;
//!
//! let config = MemochaConfig::default();
//! assert_eq!(config.server.port, 8000);
//! assert_eq!(config.circuit_breaker.failure_threshold, 3);
//!
//! let toml = r#"
//! [llm]
//! model = "gpt-4o-mini"
//! "#;
//! let config: MemochaConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.llm.model, "gpt-4o-mini");
//! ```

pub mod error;
pub mod llm;
pub mod logging;
pub mod resilience;
pub mod server;

pub use error::ConfigError;
pub use llm::LlmConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use resilience::{CircuitBreakerConfig, RetryConfig};
pub use server::{HistoryConfig, ServerConfig};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable holding the provider credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Unified configuration for the Memocha server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MemochaConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Generation provider settings
    pub llm: LlmConfig,
    /// Breaker guarding the provider
    pub circuit_breaker: CircuitBreakerConfig,
    /// Retry policy for transient provider failures
    pub retry: RetryConfig,
    /// Conversation history bounds
    pub history: HistoryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl MemochaConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                Ok(toml::from_str(&content)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are ignored and the current value is kept.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MEMOCHA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("MEMOCHA_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(level) = lookup("MEMOCHA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MEMOCHA_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            self.logging.format = format;
        }

        if let Some(key) = lookup(API_KEY_ENV) {
            self.llm.api_key = key;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(temperature) = lookup("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = temperature;
        }
        if let Some(max_tokens) = lookup("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = max_tokens;
        }
        if let Some(timeout) = lookup("LLM_TIMEOUT_SECONDS").and_then(|v| v.parse().ok()) {
            self.llm.timeout_seconds = timeout;
        }
        if let Some(prompt) = lookup("BASE_SYSTEM_PROMPT") {
            self.llm.system_prompt = prompt;
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "port must be non-zero"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                format!("{} is outside 0.0..=2.0", self.llm.temperature),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::invalid("llm.max_tokens", "must be non-zero"));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(ConfigError::invalid("llm.timeout_seconds", "must be non-zero"));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("llm.base_url", "URL cannot be empty"));
        }

        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker.failure_threshold",
                "must be at least 1",
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::invalid(
                "retry.base_delay_ms",
                format!(
                    "base delay {}ms exceeds max delay {}ms",
                    self.retry.base_delay_ms, self.retry.max_delay_ms
                ),
            ));
        }

        if self.history.limit == 0 {
            return Err(ConfigError::invalid("history.limit", "must be at least 1"));
        }

        Ok(())
    }

    /// Check the settings needed to actually reach the provider.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.trim().is_empty() {
            return Err(ConfigError::MissingSetting {
                field: "llm.api_key".to_string(),
                env_var: API_KEY_ENV.to_string(),
            });
        }
        Ok(())
    }
}
