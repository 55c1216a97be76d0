//! Summarization of arbitrarily large documents through a size- and
//! rate-limited text-completion service.
//!
//! # Architecture Overview
//!
//! - **Chunker**: paragraph-aligned splitting into bounded chunks
//! - **Rate governor**: minimum spacing between calls and retry backoff
//! - **Fault classifier**: maps service failures to transient, throttled,
//!   too-large or fatal
//! - **Engine**: retries, splits and merges until one summary remains
//! - **Completion gateway**: OpenAI-compatible chat-completions client
//! - **Configuration**: YAML with defaults for every field

pub mod chunker;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod fault;
pub mod governor;
pub mod llm;

pub use chunker::{chunk, ParagraphChunker};
pub use config::*;
pub use engine::{EngineSettings, SummarizeEngine};
pub use errors::DocsumError;
pub use fault::{CompletionError, FaultClassifier, FaultKind, GatewayFailure};
pub use governor::{BackoffPolicy, RateGovernor};
pub use llm::{create_gateway, CompletionGateway};

pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
pub mod test_utils;
