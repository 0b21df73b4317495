//! Bounded retries for units of work that hit transient storage errors.
//!
//! A retried operation is re-run from the start: a new transaction, fresh
//! reads, fresh validation. Nothing is resumed mid-transaction.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        jittered(self.base_delay.saturating_mul(1 << exponent))
    }
}

/// "Equal jitter": a delay in `[backoff/2, backoff]`.
fn jittered(backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }
    let half_ms = backoff_ms / 2;
    let jitter_ms = rand::rng().random_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// attempt budget is spent.
///
/// Business declines are returned unchanged on the first attempt. When every
/// attempt hits a transient error the result is `AppError::Unavailable`, so
/// callers can tell "rejected" apart from "try again later".
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                if attempt >= max_attempts {
                    tracing::error!(operation, attempt, error = %err, "retries exhausted");
                    return Err(AppError::Unavailable);
                }
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result = with_retry(&policy(), "test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::LockTimeout)
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_is_reported_as_unavailable() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), _> = with_retry(&policy(), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::LockTimeout)
        })
        .await;

        assert!(matches!(result, Err(AppError::Unavailable)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn declines_are_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), _> = with_retry(&policy(), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::InsufficientFunds)
        })
        .await;

        assert!(matches!(result, Err(AppError::InsufficientFunds)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_grows_and_stays_within_jitter_bounds() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
        };
        for _ in 0..20 {
            let first = policy.backoff(1);
            assert!(first >= Duration::from_millis(50) && first <= Duration::from_millis(100));
            let third = policy.backoff(3);
            assert!(third >= Duration::from_millis(200) && third <= Duration::from_millis(400));
        }
    }
}
