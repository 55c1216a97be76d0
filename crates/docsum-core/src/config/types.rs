//! Configuration type definitions
//!
//! Every section is optional in YAML and every field has a default, so an
//! empty document (or no file at all) yields a working configuration that
//! talks to Groq with the API key taken from `GROQ_API_KEY`.

use crate::errors::DocsumError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Summarize the input text below. Limit the summary to 1 paragraph and use a 1st grade reading level.";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DocsumConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub reduce: ReduceConfig,
    /// Wall-clock budget for one whole summarization, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub parameters: ModelParameters,
    #[serde(default)]
    pub auth: LlmAuth,
    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

/// LLM provider types. All of them speak the OpenAI chat-completions protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Groq,
    OpenAI,
    Custom {
        base_url: String,
    },
}

impl LlmProvider {
    pub fn base_url(&self) -> &str {
        match self {
            LlmProvider::Groq => "https://api.groq.com/openai/v1",
            LlmProvider::OpenAI => "https://api.openai.com/v1",
            LlmProvider::Custom { base_url } => base_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuth {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_system_prompt")]
    pub system: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total calls allowed for one input before giving up, first call included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_transient_delay_ms")]
    pub transient_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Approximate number of characters the completion service accepts.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Fraction of `max_input_chars` kept free when chunking.
    #[serde(default = "default_safety_margin")]
    pub safety_margin: f64,
}

impl ChunkingConfig {
    pub fn chunk_size(&self) -> usize {
        let size = self.max_input_chars as f64 * (1.0 - self.safety_margin);
        (size.floor() as usize).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_model() -> String { "llama3-8b-8192".to_string() }
fn default_request_timeout() -> u64 { 120 }
fn default_api_key_env() -> Option<String> { Some("GROQ_API_KEY".to_string()) }
fn default_system_prompt() -> String { DEFAULT_SYSTEM_PROMPT.to_string() }
fn default_requests_per_minute() -> u32 { 30 }
fn default_max_attempts() -> usize { 5 }
fn default_initial_backoff_ms() -> u64 { 1000 }
fn default_max_backoff_ms() -> u64 { 60_000 }
fn default_multiplier() -> f64 { 2.0 }
fn default_transient_delay_ms() -> u64 { 500 }
fn default_max_input_chars() -> usize { 24_000 }
fn default_safety_margin() -> f64 { 0.2 }
fn default_max_depth() -> usize { 8 }
fn default_max_concurrency() -> usize { 1 }
fn default_log_level() -> String { "info".to_string() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            parameters: ModelParameters::default(),
            auth: LlmAuth::default(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LlmAuth {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system: default_system_prompt(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
            transient_delay_ms: default_transient_delay_ms(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            safety_margin: default_safety_margin(),
        }
    }
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DocsumConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), DocsumError> {
        if self.llm.model.is_empty() {
            return Err(DocsumError::ConfigError("LLM model cannot be empty".to_string()));
        }

        if let LlmProvider::Custom { base_url } = &self.llm.provider {
            if base_url.is_empty() {
                return Err(DocsumError::ConfigError(
                    "Custom provider requires a valid 'base_url'".to_string(),
                ));
            }
        }

        if self.prompt.system.trim().is_empty() {
            return Err(DocsumError::ConfigError("System prompt cannot be empty".to_string()));
        }

        if self.rate_limit.requests_per_minute == 0 {
            return Err(DocsumError::ConfigError(
                "rate_limit.requests_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(DocsumError::ConfigError(
                "retry.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(DocsumError::ConfigError(
                "retry.multiplier must be at least 1.0".to_string(),
            ));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(DocsumError::ConfigError(
                "retry.initial_backoff_ms cannot exceed retry.max_backoff_ms".to_string(),
            ));
        }

        if self.chunking.max_input_chars == 0 {
            return Err(DocsumError::ConfigError(
                "chunking.max_input_chars must be greater than 0".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.chunking.safety_margin) {
            return Err(DocsumError::ConfigError(
                "chunking.safety_margin must be in [0, 1)".to_string(),
            ));
        }

        if self.reduce.max_depth == 0 {
            return Err(DocsumError::ConfigError(
                "reduce.max_depth must be greater than 0".to_string(),
            ));
        }

        if self.reduce.max_concurrency == 0 {
            return Err(DocsumError::ConfigError(
                "reduce.max_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.timeout_secs == Some(0) {
            return Err(DocsumError::ConfigError(
                "timeout_secs must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}
