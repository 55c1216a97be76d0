// src/test_utils/stub_gateway.rs
use crate::fault::CompletionError;
use crate::llm::CompletionGateway;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str, usize) -> Result<String, CompletionError> + Send + Sync;

/// In-process gateway whose behaviour is a closure over the input text and
/// the zero-based call index. Every input is recorded.
#[derive(Clone)]
pub struct StubGateway {
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubGateway {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replies in order from `script`; runs out into a fatal error.
    pub fn scripted(script: Vec<Result<String, CompletionError>>) -> Self {
        Self::new(move |_, index| {
            script
                .get(index)
                .cloned()
                .unwrap_or_else(|| Err(CompletionError::fatal("No more scripted replies")))
        })
    }

    /// Rejects inputs longer than `limit` characters as too large and
    /// otherwise answers with a short tag naming the call.
    pub fn size_limited(limit: usize) -> Self {
        Self::new(move |text, index| {
            if text.chars().count() > limit {
                Err(CompletionError::too_large(format!(
                    "input of {} chars exceeds {}",
                    text.chars().count(),
                    limit
                )))
            } else {
                Ok(format!("S{}", index))
            }
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionGateway for StubGateway {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_text: &str,
        _model_id: &str,
    ) -> Result<String, CompletionError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(user_text.to_string());
            calls.len() - 1
        };
        (self.responder)(user_text, index)
    }
}
