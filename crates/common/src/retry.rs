//! Bounded polling with linear backoff.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::PaymentError;

/// A bounded polling schedule: `max_attempts` probes, sleeping
/// `initial_delay + n * backoff_step` before attempt `n` (zero-based).
/// A zero `backoff_step` gives a fixed-interval schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            backoff_step: Duration::ZERO,
        }
    }

    pub const fn linear(max_attempts: u32, initial_delay: Duration, backoff_step: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_step,
        }
    }

    /// Delay before the zero-based attempt `n`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.initial_delay + self.backoff_step * attempt
    }

    /// Repeatedly evaluate `probe` until it yields a value or the schedule
    /// is exhausted. `Ok(None)` means exhaustion, which callers treat as an
    /// inconclusive outcome rather than a failure. Probe errors abort
    /// immediately.
    pub async fn poll_until<T, F, Fut>(&self, what: &str, mut probe: F) -> Result<Option<T>, PaymentError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, PaymentError>>,
    {
        for attempt in 0..self.max_attempts {
            tokio::time::sleep(self.delay_before(attempt)).await;
            if let Some(value) = probe().await? {
                return Ok(Some(value));
            }
            debug!(what, attempt = attempt + 1, max = self.max_attempts, "poll inconclusive");
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_schedule() {
        let fixed = RetryPolicy::fixed(3, Duration::from_secs(1));
        assert_eq!(fixed.delay_before(0), Duration::from_secs(1));
        assert_eq!(fixed.delay_before(2), Duration::from_secs(1));

        let linear = RetryPolicy::linear(10, Duration::from_secs(1), Duration::from_secs(1));
        assert_eq!(linear.delay_before(0), Duration::from_secs(1));
        assert_eq!(linear.delay_before(4), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_returns_first_hit() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        let result = policy
            .poll_until("receipt", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(if n == 3 { Some(n) } else { None }) }
            })
            .await
            .unwrap();
        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_exhaustion_is_not_an_error() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        let result: Option<u32> = policy
            .poll_until("receipt", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            })
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_probe_error_aborts() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        let result: Result<Option<u32>, _> = policy
            .poll_until("completion", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PaymentError::Transport("connection refused".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
