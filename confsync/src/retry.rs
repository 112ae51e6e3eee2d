use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::warn;

/// Bounded retry budget for remote calls. Injected into the store and
/// identity gateways instead of being read from the environment at call
/// sites, so tests can run with a one-attempt policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms()
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Single attempt, no backoff. Used by tests that script failures.
    pub fn none() -> Self {
        Self::with_max_attempts(1)
    }
}

/// Runs `operation` until it succeeds, the error is not transient, or the
/// attempt budget is spent. The final error is returned untouched so the
/// caller can classify it.
pub async fn retry_transient<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_transient: impl Fn(&E) -> bool,
    operation: F
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display
{
    let mut backoff = ExponentialBackoff::from_millis(policy.initial_backoff_ms).map(|duration| {
        let capped = duration.min(Duration::from_millis(policy.max_backoff_ms));
        jitter(capped)
    });

    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= policy.max_attempts || !is_transient(&e) {
                    return Err(e);
                }

                let delay = backoff
                    .next()
                    .unwrap_or(Duration::from_millis(policy.max_backoff_ms));
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 5
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> =
            retry_transient(&fast_policy(5), "op", |_| true, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err("transient".to_string()) } else { Ok(n) }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> =
            retry_transient(&fast_policy(3), "op", |_| true, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("still failing".to_string())
            })
            .await;

        assert_eq!(result, Err("still failing".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> =
            retry_transient(&fast_policy(5), "op", |_| false, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal".to_string())
            })
            .await;

        assert_eq!(result, Err("fatal".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
