//! Bounded retry with linear/multiplicative backoff around a single
//! asynchronous operation.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::errors::EngineError;

/// Retry budget and backoff shape for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Must be at least 1.
    pub retries: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each wait. Must be >= 1.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_delay_ms: 0,
            backoff_factor: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Reject an unusable policy before any attempt is made.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.retries < 1 {
            return Err(EngineError::InvalidConfiguration(
                "retries must be at least 1".into(),
            ));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "backoff factor must be a finite number >= 1, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }
}

/// Failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The policy was rejected before any attempt.
    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),
    /// Every attempt failed; `last` is the final error observed.
    #[error("operation failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: anyhow::Error,
    },
}

/// Delay growth: integer-ceiling multiplicative. No cap, no jitter.
fn next_delay_ms(current_ms: u64, backoff_factor: f64) -> u64 {
    (current_ms as f64 * backoff_factor).ceil() as u64
}

/// Run `operation` up to `policy.retries` times.
///
/// Between attempts (never after the final one) `on_retry(attempt, err)`
/// is invoked and the current delay is slept, then grown by the backoff
/// factor. Returns the first success, or [`RetryError::Exhausted`]
/// carrying the last error observed.
pub async fn with_retry<T, F, Fut, H>(
    policy: &RetryPolicy,
    mut on_retry: H,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
    H: FnMut(u32, &anyhow::Error),
{
    policy
        .validate()
        .map_err(|e| RetryError::InvalidPolicy(e.to_string()))?;

    let mut delay_ms = policy.initial_delay_ms;
    let mut last_err: Option<anyhow::Error> = None;

    for attempt in 1..=policy.retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < policy.retries {
                    on_retry(attempt, &err);
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    delay_ms = next_delay_ms(delay_ms, policy.backoff_factor);
                }
                last_err = Some(err);
            }
        }
    }

    Err(RetryError::Exhausted {
        attempts: policy.retries,
        last: last_err.unwrap_or_else(|| anyhow::anyhow!("retry loop produced no error")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let retry_calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            retries: 3,
            ..RetryPolicy::default()
        };

        let result = with_retry(
            &policy,
            |_, _| {
                retry_calls.fetch_add(1, Ordering::SeqCst);
            },
            || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    anyhow::bail!("transient failure {n}")
                }
                Ok(42)
            },
        )
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(retry_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhaustion_rethrows_last_error() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy {
            retries: 2,
            ..RetryPolicy::default()
        };

        let result: Result<(), RetryError> = with_retry(
            &policy,
            |_, _| {},
            || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                anyhow::bail!("failure {n}")
            },
        )
        .await;

        match result {
            Err(RetryError::Exhausted { attempts: a, last }) => {
                assert_eq!(a, 2);
                assert_eq!(last.to_string(), "failure 2");
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_retries_fails_before_any_attempt() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy {
            retries: 0,
            ..RetryPolicy::default()
        };

        let result: Result<(), RetryError> = with_retry(&policy, |_, _| {}, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(RetryError::InvalidPolicy(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_on_retry_after_final_attempt() {
        let retry_calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            retries: 1,
            ..RetryPolicy::default()
        };

        let result: Result<(), RetryError> = with_retry(
            &policy,
            |_, _| {
                retry_calls.fetch_add(1, Ordering::SeqCst);
            },
            || async { anyhow::bail!("always fails") },
        )
        .await;

        assert!(matches!(result, Err(RetryError::Exhausted { .. })));
        assert_eq!(retry_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delays_grow_by_ceiling_multiplication() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy {
            retries: 4,
            initial_delay_ms: 10,
            backoff_factor: 1.5,
        };

        let start = tokio::time::Instant::now();
        let result: Result<(), RetryError> = with_retry(
            &policy,
            |_, _| {},
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("nope")
            },
        )
        .await;
        assert!(result.is_err());

        // 10 + ceil(10*1.5)=15 + ceil(15*1.5)=23 -> 48ms total sleep
        assert_eq!(start.elapsed(), Duration::from_millis(48));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn next_delay_rounds_up() {
        assert_eq!(next_delay_ms(10, 1.0), 10);
        assert_eq!(next_delay_ms(10, 1.5), 15);
        assert_eq!(next_delay_ms(15, 1.5), 23);
        assert_eq!(next_delay_ms(0, 2.0), 0);
        assert_eq!(next_delay_ms(1, 2.5), 3);
    }

    #[test]
    fn default_policy_matches_engine_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.initial_delay_ms, 0);
        assert_eq!(policy.backoff_factor, 1.0);
        policy.validate().unwrap();
    }

    #[test]
    fn sub_one_backoff_factor_is_rejected() {
        let policy = RetryPolicy {
            backoff_factor: 0.5,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
