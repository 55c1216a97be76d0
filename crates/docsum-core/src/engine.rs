//! Recursive summarize-and-reduce over a size-limited completion service
//!
//! The engine first offers the whole text to the gateway. Retryable faults
//! are retried on the same input with backoff, up to a fixed number of calls.
//! A too-large fault splits the text into paragraph-aligned chunks, summarizes
//! each chunk, joins the chunk summaries in source order and summarizes the
//! joined text. Summaries that together exceed the chunk size are first merged
//! in ordered batches, level by level. Every split hands strictly smaller pieces to the next level,
//! and the nesting depth is capped, so the recursion always terminates.

use crate::chunker::chunk;
use crate::config::DocsumConfig;
use crate::errors::DocsumError;
use crate::fault::FaultKind;
use crate::governor::{BackoffPolicy, RateGovernor};
use crate::llm::CompletionGateway;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Separator between summaries merged into one text.
const SUMMARY_SEPARATOR: &str = " ";

/// Tunables for one engine, usually derived from `DocsumConfig`.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub system_prompt: String,
    pub model_id: String,
    /// Chunk size used when a text must be split, in characters.
    pub chunk_size: usize,
    /// Total gateway calls allowed for one input, first call included.
    pub max_attempts: usize,
    pub max_depth: usize,
    pub max_concurrency: usize,
    pub backoff: BackoffPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &DocsumConfig) -> Self {
        Self {
            system_prompt: config.prompt.system.clone(),
            model_id: config.llm.model.clone(),
            chunk_size: config.chunking.chunk_size(),
            max_attempts: config.retry.max_attempts.max(1),
            max_depth: config.reduce.max_depth,
            max_concurrency: config.reduce.max_concurrency.max(1),
            backoff: BackoffPolicy::from_config(&config.retry),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&DocsumConfig::default())
    }
}

/// Bookkeeping for the calls made on one input text.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub input_chars: usize,
    pub depth: usize,
    pub calls: usize,
    pub last_fault: Option<FaultKind>,
}

impl Attempt {
    fn new(text: &str, depth: usize) -> Self {
        Self {
            input_chars: text.chars().count(),
            depth,
            calls: 0,
            last_fault: None,
        }
    }
}

pub struct SummarizeEngine {
    gateway: Arc<dyn CompletionGateway>,
    governor: Arc<RateGovernor>,
    settings: EngineSettings,
    in_flight: Semaphore,
}

impl SummarizeEngine {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        governor: Arc<RateGovernor>,
        settings: EngineSettings,
    ) -> Self {
        let in_flight = Semaphore::new(settings.max_concurrency.max(1));
        Self {
            gateway,
            governor,
            settings,
            in_flight,
        }
    }

    /// Engine with a governor and settings built from `config`.
    pub fn from_config(gateway: Arc<dyn CompletionGateway>, config: &DocsumConfig) -> Self {
        let governor = Arc::new(RateGovernor::per_minute(config.rate_limit.requests_per_minute));
        Self::new(gateway, governor, EngineSettings::from_config(config))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn summarize(&self, text: &str) -> Result<String, DocsumError> {
        self.summarize_with_cancellation(text, &CancellationToken::new())
            .await
    }

    /// Summarizes `text`, aborting promptly once `cancel` fires.
    pub async fn summarize_with_cancellation(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DocsumError> {
        if text.trim().is_empty() {
            debug!("Empty input, nothing to summarize");
            return Ok(String::new());
        }

        let summary = self.summarize_level(text.trim().to_string(), 0, cancel).await?;
        info!(
            "Summarized {} characters into {} characters",
            text.chars().count(),
            summary.chars().count()
        );
        Ok(summary)
    }

    fn summarize_level<'a>(
        &'a self,
        text: String,
        depth: usize,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<String, DocsumError>> {
        async move {
            let mut attempt = Attempt::new(&text, depth);

            loop {
                if cancel.is_cancelled() {
                    return Err(DocsumError::Cancelled);
                }

                attempt.calls += 1;
                let outcome = {
                    let _permit = self
                        .in_flight
                        .acquire()
                        .await
                        .map_err(|_| DocsumError::Cancelled)?;
                    self.governor.acquire_slot(cancel).await?;
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(DocsumError::Cancelled),
                        result = self.gateway.complete(
                            &self.settings.system_prompt,
                            &text,
                            &self.settings.model_id,
                        ) => result,
                    }
                };

                let error = match outcome {
                    Ok(summary) => {
                        debug!("Completed {:?}", attempt);
                        return Ok(summary);
                    }
                    Err(error) => error,
                };
                attempt.last_fault = Some(error.kind);

                match error.kind {
                    FaultKind::Fatal => {
                        error!("Fatal completion failure at depth {}: {}", depth, error.message);
                        return Err(error.into());
                    }
                    FaultKind::TooLarge => {
                        info!(
                            "Input of {} characters rejected as too large at depth {}, splitting",
                            attempt.input_chars, depth
                        );
                        return self.reduce(text, depth, cancel).await;
                    }
                    FaultKind::Transient | FaultKind::Throttled => {
                        if attempt.calls >= self.settings.max_attempts {
                            error!("Giving up after {:?}", attempt);
                            return Err(DocsumError::RetriesExhausted {
                                attempts: attempt.calls,
                                kind: error.kind,
                                message: error.message,
                            });
                        }

                        let delay = self.settings.backoff.delay_for(&error, attempt.calls);
                        warn!(
                            "{} fault on attempt {}/{}, retrying in {:?}: {}",
                            error.kind,
                            attempt.calls,
                            self.settings.max_attempts,
                            delay,
                            error.message
                        );
                        self.governor.backoff(delay).await;
                    }
                }
            }
        }
        .boxed()
    }

    /// Splits `text`, summarizes every chunk, then summarizes the joined
    /// chunk summaries. When the joined summaries would not fit in one chunk
    /// they are merged in ordered batches first, one level at a time.
    async fn reduce(
        &self,
        text: String,
        depth: usize,
        cancel: &CancellationToken,
    ) -> Result<String, DocsumError> {
        if depth >= self.settings.max_depth {
            return Err(DocsumError::DepthExceeded(self.settings.max_depth));
        }

        let chunks = self.split_for_reduce(&text);
        if chunks.len() < 2 {
            return Err(DocsumError::InputTooLarge {
                chars: text.chars().count(),
            });
        }

        info!(
            "Split {} characters into {} chunks at depth {}",
            text.chars().count(),
            chunks.len(),
            depth
        );

        let mut level = depth + 1;
        let mut summaries = self.summarize_all(chunks, level, cancel).await?;

        loop {
            let batches = batch_summaries(&summaries, self.settings.chunk_size);
            if batches.len() < 2 {
                break;
            }
            if level >= self.settings.max_depth {
                return Err(DocsumError::DepthExceeded(self.settings.max_depth));
            }

            info!(
                "Merging {} chunk summaries in {} batches at depth {}",
                summaries.len(),
                batches.len(),
                level
            );
            level += 1;
            summaries = self.summarize_all(batches, level, cancel).await?;
        }

        let combined = summaries.join(SUMMARY_SEPARATOR);
        info!(
            "Merging {} chunk summaries ({} characters) at depth {}",
            summaries.len(),
            combined.chars().count(),
            level
        );

        self.summarize_level(combined, level, cancel).await
    }

    /// Summarizes `texts` at `depth`, keeping their order.
    async fn summarize_all(
        &self,
        texts: Vec<String>,
        depth: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, DocsumError> {
        stream::iter(texts)
            .map(|piece| self.summarize_level(piece, depth, cancel))
            .buffered(self.settings.max_concurrency.max(1))
            .try_collect()
            .await
    }

    /// Chunks at the configured size. When the text already fits in one
    /// chunk the service's real limit is below our estimate, so fall back to
    /// halving the text.
    fn split_for_reduce(&self, text: &str) -> Vec<String> {
        let chunks = chunk(text, self.settings.chunk_size);
        if chunks.len() >= 2 {
            return chunks;
        }

        let half = text.chars().count().div_ceil(2);
        debug!("Text fits one chunk of {}, re-chunking at {}", self.settings.chunk_size, half);
        chunk(text, half)
    }
}

/// Groups consecutive summaries into space-joined batches of at most
/// `max_size` characters. Every batch but the last holds at least two
/// summaries, so each round of batching strictly shrinks the count.
fn batch_summaries(summaries: &[String], max_size: usize) -> Vec<String> {
    let separator_len = SUMMARY_SEPARATOR.chars().count();
    let mut batches = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut current_count = 0;

    for summary in summaries {
        let summary_len = summary.chars().count();

        if current_count >= 2 && current_len + separator_len + summary_len > max_size {
            batches.push(std::mem::take(&mut current));
            current_len = 0;
            current_count = 0;
        }

        if current_count > 0 {
            current.push_str(SUMMARY_SEPARATOR);
            current_len += separator_len;
        }
        current.push_str(summary);
        current_len += summary_len;
        current_count += 1;
    }

    if current_count > 0 {
        batches.push(current);
    }

    batches
}
