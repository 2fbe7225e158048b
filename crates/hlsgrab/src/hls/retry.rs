// Bounded retry with exponential backoff for segment transfers.

use std::future::Future;
use std::time::Duration;

use rand::RngExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::DownloadError;
use crate::hls::config::HlsFetcherConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first one. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for every further one
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Add up to half of `base_delay` at random, never exceeding `max_delay`
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    pub fn from_fetcher_config(config: &HlsFetcherConfig) -> Self {
        Self {
            max_retries: config.max_segment_retries,
            base_delay: config.segment_retry_delay_base,
            max_delay: config.segment_retry_max_delay,
            jitter: config.retry_jitter,
        }
    }

    /// Backoff before retry number `attempt + 1`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);

        if !self.jitter {
            return delay;
        }

        let headroom = self.max_delay.saturating_sub(delay);
        let spread = (self.base_delay / 2).min(headroom);
        let spread_ms = u64::try_from(spread.as_millis()).unwrap_or(u64::MAX);
        if spread_ms == 0 {
            return delay;
        }

        delay + Duration::from_millis(rand::rng().random_range(0..spread_ms))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error or
/// runs out of retries. The last error is returned on exhaustion.
///
/// The token is checked before every attempt and interrupts backoff sleeps,
/// never an attempt in progress.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut operation: F,
) -> Result<T, DownloadError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DownloadError>>,
{
    let mut attempt = 0;
    loop {
        if token.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt >= policy.max_retries || !err.is_retryable() {
            return Err(err);
        }

        let delay = policy.delay_for_attempt(attempt);
        attempt += 1;
        warn!(
            attempt,
            max = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after transient error"
        );

        tokio::select! {
            _ = token.cancelled() => return Err(DownloadError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
