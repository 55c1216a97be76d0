//! Call spacing and backoff for the completion service
//!
//! A single `RateGovernor` is shared by every call the engine makes. Slot
//! grants are serialised through one mutex, so the spacing holds even when
//! chunk summaries are computed concurrently.

use crate::config::RetryConfig;
use crate::errors::DocsumError;
use crate::fault::{CompletionError, FaultKind};
use log::{debug, info};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct GovernorState {
    last_grant: Option<Instant>,
    pending_backoff: Option<Duration>,
}

/// Enforces a minimum interval between completion calls.
#[derive(Debug)]
pub struct RateGovernor {
    interval: Duration,
    state: Mutex<GovernorState>,
}

impl RateGovernor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Mutex::new(GovernorState::default()),
        }
    }

    /// Governor allowing at most `requests_per_minute` calls per minute.
    /// Zero disables spacing.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        if requests_per_minute == 0 {
            return Self::new(Duration::ZERO);
        }
        Self::new(Duration::from_secs(60) / requests_per_minute)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Asks for the next slot to be held back by `delay`. When several
    /// requests are outstanding the longest one wins.
    pub async fn backoff(&self, delay: Duration) {
        let mut state = self.state.lock().await;
        let pending = state.pending_backoff.get_or_insert(Duration::ZERO);
        *pending = (*pending).max(delay);
        debug!("Backoff of {:?} requested before next slot", delay);
    }

    /// Waits until a call may be made, then records the grant.
    ///
    /// Callers queue on the internal mutex, so every caller is eventually
    /// served in arrival order.
    pub async fn acquire_slot(&self, cancel: &CancellationToken) -> Result<(), DocsumError> {
        let mut state = self.state.lock().await;

        if let Some(delay) = state.pending_backoff.take() {
            info!("Backing off for {:?} before next request", delay);
            sleep_or_cancel(delay, cancel).await?;
        }

        if let Some(last) = state.last_grant {
            let ready_at = last + self.interval;
            let now = Instant::now();
            if ready_at > now {
                let wait = ready_at - now;
                debug!("Rate governor waiting {:?} for next slot", wait);
                sleep_or_cancel(wait, cancel).await?;
            }
        }

        state.last_grant = Some(Instant::now());
        Ok(())
    }
}

async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), DocsumError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(DocsumError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Computes the delay before retrying a failed call.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
    pub transient_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_backoff_ms),
            max: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.multiplier,
            transient_delay: Duration::from_millis(config.transient_delay_ms),
        }
    }

    /// Delay before retry number `retry` (1-based) after `error`.
    /// Always positive.
    pub fn delay_for(&self, error: &CompletionError, retry: usize) -> Duration {
        let delay = if let Some(hint) = error.retry_after {
            hint.min(self.max)
        } else {
            match error.kind {
                FaultKind::Throttled => {
                    let exponent = retry.saturating_sub(1).min(32) as i32;
                    let factor = self.multiplier.max(1.0).powi(exponent);
                    let scaled = self.initial.as_secs_f64() * factor;
                    Duration::from_secs_f64(scaled.min(self.max.as_secs_f64()))
                }
                _ => self.transient_delay,
            }
        };

        delay.max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_per_minute_interval() {
        assert_eq!(RateGovernor::per_minute(30).interval(), Duration::from_secs(2));
        assert_eq!(RateGovernor::per_minute(0).interval(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_slot_is_immediate() {
        let governor = RateGovernor::new(Duration::from_secs(5));
        let start = Instant::now();
        governor.acquire_slot(&CancellationToken::new()).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_are_spaced_by_interval() {
        let governor = RateGovernor::new(Duration::from_secs(2));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        for _ in 0..3 {
            governor.acquire_slot(&cancel).await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_secs(4));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_next_slot() {
        let governor = RateGovernor::new(Duration::ZERO);
        let cancel = CancellationToken::new();
        governor.acquire_slot(&cancel).await.unwrap();

        governor.backoff(Duration::from_secs(3)).await;
        governor.backoff(Duration::from_secs(1)).await;

        let start = Instant::now();
        governor.acquire_slot(&cancel).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(3));

        // Backoff is consumed by a single slot.
        let start = Instant::now();
        governor.acquire_slot(&cancel).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_all_get_slots() {
        let governor = Arc::new(RateGovernor::new(Duration::from_secs(1)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let governor = governor.clone();
                tokio::spawn(async move {
                    governor.acquire_slot(&CancellationToken::new()).await.unwrap();
                    Instant::now()
                })
            })
            .collect();

        let mut grants = Vec::new();
        for handle in handles {
            grants.push(handle.await.unwrap());
        }
        grants.sort();

        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let governor = RateGovernor::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        governor.acquire_slot(&cancel).await.unwrap();

        cancel.cancel();
        let result = governor.acquire_slot(&cancel).await;
        assert!(matches!(result, Err(DocsumError::Cancelled)));
    }

    #[test]
    fn test_throttled_backoff_grows_and_caps() {
        let policy = BackoffPolicy {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
            multiplier: 2.0,
            transient_delay: Duration::from_millis(200),
        };
        let error = CompletionError::throttled("rate limited");

        assert_eq!(policy.delay_for(&error, 1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(&error, 2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(&error, 3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(&error, 4), Duration::from_secs(5));
    }

    #[test]
    fn test_transient_delay_is_fixed() {
        let policy = BackoffPolicy::default();
        let error = CompletionError::transient("502");
        assert_eq!(policy.delay_for(&error, 1), policy.delay_for(&error, 4));
    }

    #[test]
    fn test_retry_after_hint_wins() {
        let policy = BackoffPolicy::default();
        let error = CompletionError::throttled("slow down").with_retry_after(Duration::from_secs(9));
        assert_eq!(policy.delay_for(&error, 1), Duration::from_secs(9));
    }

    #[test]
    fn test_delay_is_always_positive() {
        let policy = BackoffPolicy {
            initial: Duration::ZERO,
            max: Duration::ZERO,
            multiplier: 1.0,
            transient_delay: Duration::ZERO,
        };
        assert!(policy.delay_for(&CompletionError::throttled("x"), 1) > Duration::ZERO);
        assert!(policy.delay_for(&CompletionError::transient("x"), 1) > Duration::ZERO);
    }
}
