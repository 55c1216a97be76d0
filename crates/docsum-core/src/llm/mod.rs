//! Completion gateway abstraction and provider integrations.
//!
//! The engine consumes a single capability: turn a system prompt and a user
//! text into a completion, or fail with a classified `CompletionError`.

use crate::fault::CompletionError;
use async_trait::async_trait;

pub mod providers;

pub use providers::create_gateway;
pub use providers::openai::ChatCompletionsClient;

#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        model_id: &str,
    ) -> Result<String, CompletionError>;
}
