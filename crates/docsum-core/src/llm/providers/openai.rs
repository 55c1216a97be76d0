use crate::errors::DocsumError;
use crate::fault::{CompletionError, FaultClassifier, GatewayFailure};
use crate::llm::CompletionGateway;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Client for OpenAI-compatible `chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    api_key: String,
    api_base: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    classifier: FaultClassifier,
}

impl ChatCompletionsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: "https://api.groq.com/openai/v1".to_string(),
            temperature: None,
            max_tokens: None,
            classifier: FaultClassifier::new(),
        }
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, DocsumError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DocsumError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn build_request_body(&self, system_prompt: &str, user_text: &str, model_id: &str) -> Value {
        let mut body = json!({
            "model": model_id,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_text },
            ],
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = temp.into();
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }

        body
    }

    fn parse_response(&self, response: &Value) -> Result<String, CompletionError> {
        let content = response["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| CompletionError::fatal("Response has no choices[0].message.content"))?;

        Ok(content.trim().to_string())
    }

    fn failure_from_response(status: u16, headers: &HeaderMap, body: &str) -> GatewayFailure {
        let envelope: Option<Value> = serde_json::from_str(body).ok();
        let error = envelope.as_ref().map(|v| &v["error"]);

        let message = error
            .and_then(|e| e["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());

        let mut failure = GatewayFailure::http(status, message);

        let code = error.and_then(|e| e["code"].as_str().or_else(|| e["type"].as_str()));
        if let Some(code) = code {
            failure = failure.with_code(code);
        }

        if let Some(retry_after) = parse_retry_after(headers) {
            failure = failure.with_retry_after(retry_after);
        }

        failure
    }

    fn transport_error(&self, context: &str, err: reqwest::Error) -> CompletionError {
        let message = format!("{}: {}", context, err);
        if err.is_timeout() || err.is_connect() {
            self.classifier.to_completion_error(GatewayFailure::transport(message))
        } else {
            CompletionError::fatal(message)
        }
    }
}

/// Reads `Retry-After` given in (possibly fractional) seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = value.trim().parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

#[async_trait]
impl CompletionGateway for ChatCompletionsClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        model_id: &str,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request_body(system_prompt, user_text, model_id);

        log::debug!(
            "Chat completion request to {} (model {}, {} input chars)",
            url,
            model_id,
            user_text.chars().count()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error("HTTP request failed", e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let response_text = response
            .text()
            .await
            .map_err(|e| self.transport_error("Failed to read response", e))?;

        log::debug!("Chat completion response ({}): {} bytes", status, response_text.len());

        if !status.is_success() {
            let failure = Self::failure_from_response(status.as_u16(), &headers, &response_text);
            let error = self.classifier.to_completion_error(failure);
            log::debug!("Completion call failed: {}", error);
            return Err(error);
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .map_err(|e| CompletionError::fatal(format!("Invalid JSON response: {}", e)))?;

        self.parse_response(&response_json)
    }
}
