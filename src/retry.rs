//! Caller-side retry for page loads.
//!
//! The picker never retries a failed fetch on its own; a failure only clears
//! the in-flight flag. Drivers that want persistence wrap `load_next` here.

use std::time::Duration;

use rand::Rng as _;

use crate::error::PickerError;
use crate::picker::Picker;

/// Exponential backoff with jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// No retries at all: the first failure is returned.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-indexed).
    ///
    /// `min(base * 2^retry, max) + jitter(0..base)`
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let exp_ms = base_ms.saturating_mul(1u64.checked_shl(retry).unwrap_or(u64::MAX));
        let capped = exp_ms.min(self.max_delay.as_millis() as u64);
        let jitter = if base_ms > 0 {
            rand::thread_rng().gen_range(0..base_ms)
        } else {
            0
        };
        Duration::from_millis(capped + jitter)
    }
}

/// `picker.load_next()`, retried on retryable failures.
///
/// Each failed attempt still surfaces a `FetchFailed` event from the picker.
pub async fn load_next_with_retry(
    picker: &mut Picker,
    policy: &RetryPolicy,
) -> Result<bool, PickerError> {
    let total_attempts = policy.max_retries + 1;
    let mut attempt = 0;
    loop {
        match picker.load_next().await {
            Ok(applied) => return Ok(applied),
            Err(e) if e.is_retryable() && attempt + 1 < total_attempts => {
                let delay = policy.delay_for_retry(attempt);
                tracing::warn!(
                    "Page load failed (attempt {}/{}), retrying in {}ms: {}",
                    attempt + 1,
                    total_attempts,
                    delay.as_millis(),
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
