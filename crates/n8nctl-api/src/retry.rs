//! Retry logic with exponential backoff and jitter.
//!
//! Transient failures (network errors, HTTP 5xx) back off exponentially up
//! to a fixed low attempt ceiling. HTTP 429 overrides the computed delay
//! with the server's `Retry-After` when present. Permanent failures return
//! immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{ApiError, Result};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,
    /// Initial retry delay
    pub initial_delay: Duration,
    /// Maximum retry delay
    pub max_delay: Duration,
    /// Exponential backoff multiplier
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before the given retry attempt (1-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let mut delay = self.initial_delay.as_millis() as f64;
        if self.multiplier > 1.0 {
            delay *= self.multiplier.powi(attempt as i32 - 1);
        }
        delay = delay.min(self.max_delay.as_millis() as f64);

        if self.jitter_factor > 0.0 {
            let mut rng = rand::thread_rng();
            let jitter = rng.gen_range(-self.jitter_factor..=self.jitter_factor);
            delay *= 1.0 + jitter;
        }
        Duration::from_millis(delay.max(0.0) as u64)
    }
}

/// Run an async operation under the policy.
pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !err.is_retryable() {
                    return Err(err);
                }
                let delay = match &err {
                    ApiError::RateLimited {
                        retry_after: Some(server_delay),
                    } => *server_delay,
                    _ => policy.calculate_delay(attempt),
                };
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delays_grow_exponentially_and_cap() {
        let policy = RetryPolicy {
            jitter_factor: 0.0,
            ..Default::default()
        };
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(250));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(500));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(1000));
        assert_eq!(policy.calculate_delay(20), Duration::from_secs(10));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.calculate_delay(2).as_millis() as f64;
            assert!((450.0..=550.0).contains(&delay), "delay {delay} out of range");
        }
    }

    #[tokio::test]
    async fn transient_errors_retry_up_to_cap() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(1),
            jitter_factor: 0.0,
            ..Default::default()
        };
        let result: Result<()> = retry_with_policy(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ApiError::Server {
                    status: 503,
                    message: "unavailable".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_do_not_retry() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let result: Result<()> = retry_with_policy(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ApiError::Validation {
                    message: "bad payload".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovery_after_one_failure_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(1),
            jitter_factor: 0.0,
            ..Default::default()
        };
        let result = retry_with_policy(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ApiError::Network {
                        message: "reset".into(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
