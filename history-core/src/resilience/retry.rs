use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Bound on attempts plus the fixed delay inserted between them. Identical
/// for reads and writes unless configured separately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

/// Runs `action` up to `policy.max_attempts()` times, sleeping the fixed
/// backoff between attempts. The first success returns immediately; once the
/// attempts are exhausted the last failure surfaces unchanged in kind.
///
/// The executor does not judge failures beyond one rule: an error whose kind
/// is not retryable (`HistoryError::is_retryable`) stops the loop on the
/// attempt that produced it. Callers are expected to hand it actions whose
/// transient failures are meant to be retried.
pub async fn execute_with_retry<T, F, Fut>(policy: RetryPolicy, mut action: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && err.is_retryable() => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "attempt failed, backing off before retry"
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::HistoryError;

    fn transient(message: &str) -> HistoryError {
        HistoryError::Storage {
            query_id: "q1".to_string(),
            message: message.to_string(),
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn returns_immediately_on_first_success() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(policy(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_on_attempt_k_with_exactly_k_invocations() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(policy(5), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(transient("intermittent"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_surfaces_the_final_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = execute_with_retry(policy(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(transient(&format!("failure {n}"))) }
        })
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, HistoryError::Storage { .. }));
        assert!(err.to_string().contains("failure 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_the_loop_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<String> = execute_with_retry(policy(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(HistoryError::NotFound {
                    query_id: "missing".to_string(),
                })
            }
        })
        .await;
        assert!(matches!(
            result.unwrap_err(),
            HistoryError::NotFound { .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn policy_clamps_attempts_to_at_least_one() {
        assert_eq!(policy(0).max_attempts(), 1);
        assert_eq!(policy(4).max_attempts(), 4);
    }
}
