//! Exponential backoff for rate-limited oracle calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::OracleError;

/// How often and how patiently to retry a rate-limited call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    /// Upper bound of the random extra delay, in seconds, scaled like the
    /// base delay.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no waiting. Used by tests and offline tooling.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            jitter: 0.0,
            ..Self::default()
        }
    }

    /// Delay before retrying after the zero-based `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scale = self.multiplier.powi(attempt as i32);
        let jitter = if self.jitter > 0.0 {
            fastrand::f64() * self.jitter * scale
        } else {
            0.0
        };
        self.base_delay.mul_f64(scale) + Duration::from_secs_f64(jitter)
    }
}

/// Run `call`, retrying only on [`OracleError::RateLimited`].
///
/// Other errors, and the last rate-limit error once attempts run out, are
/// returned as-is.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T, OracleError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OracleError>>,
{
    let mut attempt = 0;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Oracle rate limited, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(error = %err, attempts = attempt + 1, "Oracle call failed");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_grows_exponentially() {
        let policy = RetryPolicy::default();
        for attempt in 0..3 {
            let delay = policy.delay_for(attempt).as_secs_f64();
            let base = 2f64.powi(attempt as i32);
            assert!(delay >= base, "attempt {attempt}: {delay}");
            assert!(delay <= base + 0.1 * base, "attempt {attempt}: {delay}");
        }
    }

    #[test]
    fn test_immediate_policy_never_waits() {
        assert_eq!(RetryPolicy::immediate().delay_for(2), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_rate_limit_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = call_with_retry(&RetryPolicy::immediate(), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(OracleError::RateLimited("429".into()))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_propagates() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = call_with_retry(&RetryPolicy::immediate(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(OracleError::RateLimited("429".into()))
        })
        .await;

        assert!(matches!(result, Err(OracleError::RateLimited(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = call_with_retry(&RetryPolicy::immediate(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(OracleError::Failed("bad request".into()))
        })
        .await;

        assert_eq!(result, Err(OracleError::Failed("bad request".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
