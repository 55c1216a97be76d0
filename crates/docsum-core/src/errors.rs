//! Error types for the summarization pipeline
//!
//! Only failures that survive the engine's retry and split handling surface as
//! a `DocsumError`. Completion-service faults that the engine absorbs travel as
//! `CompletionError` values (see `crate::fault`) and never reach callers
//! directly unless they are fatal.

use crate::fault::{CompletionError, FaultKind};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DocsumError {
    #[error("LLM interaction failed: {0}")]
    LLMError(String),
    #[error("Gave up after {attempts} attempts ({kind} fault): {message}")]
    RetriesExhausted {
        attempts: usize,
        kind: FaultKind,
        message: String,
    },
    #[error("Input of {chars} characters is too large for the completion service and cannot be split further")]
    InputTooLarge { chars: usize },
    #[error("Maximum reduction depth of {0} exceeded")]
    DepthExceeded(usize),
    #[error("Summarization cancelled")]
    Cancelled,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Document error: {0}")]
    DocumentError(String),
}

impl From<CompletionError> for DocsumError {
    fn from(err: CompletionError) -> Self {
        DocsumError::LLMError(err.message)
    }
}
