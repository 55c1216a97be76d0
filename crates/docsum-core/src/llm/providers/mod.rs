//! LLM provider implementations
//!
//! Groq, OpenAI and custom endpoints all speak the OpenAI chat-completions
//! protocol, so a single client serves every provider; only the base URL
//! differs.

use crate::config::{LlmConfig, LlmProvider};
use crate::errors::DocsumError;
use crate::llm::CompletionGateway;
use std::sync::Arc;
use std::time::Duration;

pub mod openai;

/// Create a completion gateway based on the provider configuration
pub fn create_gateway(config: &LlmConfig) -> Result<Arc<dyn CompletionGateway>, DocsumError> {
    validate_provider_config(config)?;

    let api_key = config.auth.api_key.clone().ok_or_else(|| {
        DocsumError::ConfigError(format!(
            "No API key found for {}. Set llm.auth.api_key or the {} environment variable",
            provider_name(&config.provider),
            config.auth.api_key_env.as_deref().unwrap_or("GROQ_API_KEY")
        ))
    })?;

    let mut client = openai::ChatCompletionsClient::new(api_key)
        .with_api_base(config.provider.base_url().to_string())
        .with_timeout(Duration::from_secs(config.timeout_secs))?;

    if let Some(temperature) = config.parameters.temperature {
        client = client.with_temperature(temperature);
    }
    if let Some(max_tokens) = config.parameters.max_tokens {
        client = client.with_max_tokens(max_tokens);
    }

    Ok(Arc::new(client))
}

fn provider_name(provider: &LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Groq => "Groq",
        LlmProvider::OpenAI => "OpenAI",
        LlmProvider::Custom { .. } => "custom OpenAI-compatible provider",
    }
}

/// Validate provider-specific configuration
pub fn validate_provider_config(config: &LlmConfig) -> Result<(), DocsumError> {
    if let LlmProvider::Custom { base_url } = &config.provider {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(DocsumError::ConfigError(format!(
                "Custom provider base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }
    }

    if config.timeout_secs == 0 {
        return Err(DocsumError::ConfigError(
            "llm.timeout_secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
