//! Retry with exponential backoff for transient fetch failures

use crate::config::RendererConfig;
use crate::renderer::{FetchedPage, Renderer};
use crate::state::CrawlTask;
use crate::FetchError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Longest single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles after each failure
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.backoff_ms))
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RendererConfig::default())
    }
}

/// Fetches a task, retrying transient failures with backoff
///
/// Permanent failures return immediately. Cancellation cuts a pending
/// backoff short and returns the last error.
pub async fn fetch_with_retry(
    renderer: &dyn Renderer,
    task: &CrawlTask,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<FetchedPage, FetchError> {
    let mut attempt = 1;
    loop {
        let error = match renderer.fetch(task).await {
            Ok(page) => return Ok(page),
            Err(e) => e,
        };

        if !error.is_transient() || attempt >= policy.max_attempts {
            return Err(error);
        }

        let delay = policy.delay_after(attempt);
        tracing::debug!(
            "Attempt {}/{} for {} failed ({}), retrying in {:?}",
            attempt,
            policy.max_attempts,
            task.url,
            error.reason,
            delay
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(error),
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}
