// file: src/capability/retry.rs
// description: timeout, backoff and retry wrapper for capability calls
// reference: https://docs.rs/tokio/latest/tokio/time

use crate::capability::{CapabilityError, CapabilityLimiter};
use crate::config::CapabilityConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_backoff: Duration,
    /// Applied to every attempt separately.
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CapabilityConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: config.retry_backoff(),
            timeout: config.request_timeout(),
        }
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Runs `op` under the policy. Each attempt waits for the limiter, is bounded
/// by the per-attempt timeout, and only retryable errors are retried.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    limiter: Option<&CapabilityLimiter>,
    label: &str,
    mut op: F,
) -> Result<T, CapabilityError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CapabilityError>>,
{
    let mut attempt = 0;

    loop {
        if let Some(limiter) = limiter {
            limiter.acquire().await;
        }

        let result = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout(policy.timeout)),
        };

        match result {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{}: succeeded after {} retries", label, attempt);
                }
                return Ok(value);
            }
            Err(err) if attempt < policy.max_retries && err.is_retryable() => {
                let wait = match &err {
                    CapabilityError::RateLimited {
                        retry_after: Some(after),
                    } => (*after).min(policy.timeout),
                    _ => policy.backoff_for(attempt),
                };
                warn!(
                    "{}: attempt {} failed ({}), retrying in {:.1}s",
                    label,
                    attempt + 1,
                    err,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = call_with_retry(&fast_policy(2), None, "test", || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(CapabilityError::Http("connection reset".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(assert_ok!(result), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = call_with_retry(&fast_policy(2), None, "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CapabilityError::Malformed("not json".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(CapabilityError::Malformed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = call_with_retry(&fast_policy(5), None, "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CapabilityError::Api {
                    status: 401,
                    message: "bad key".to_string(),
                })
            }
        })
        .await;

        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let policy = RetryPolicy {
            max_retries: 0,
            base_backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
        };

        let result: Result<(), _> = call_with_retry(&policy, None, "slow", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(CapabilityError::Timeout(_))));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(20), MAX_BACKOFF);
    }
}
