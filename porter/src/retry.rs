//! Bounded retry with exponential backoff for remote fetches.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::PorterError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): doubles from
    /// `initial_backoff`, capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, PorterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PorterError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(PorterError::Transient(msg)) => {
                    if attempt >= attempts {
                        return Err(PorterError::RetriesExhausted {
                            attempts,
                            last: msg,
                        });
                    }
                    let delay = self.backoff(attempt);
                    tracing::warn!(what, attempt, ?delay, error = %msg, "transient fetch failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = fast(10);
        let delays: Vec<u128> = (1..=5).map(|r| policy.backoff(r).as_millis()).collect();
        assert_eq!(delays, vec![1, 2, 4, 4, 4]);
        assert_eq!(policy.backoff(200), Duration::from_millis(4));
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast(5)
            .run("test", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(PorterError::Transient("flaky".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_is_terminal() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast(3)
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PorterError::Transient("down".into()))
            })
            .await;
        assert!(matches!(
            result,
            Err(PorterError::RetriesExhausted { attempts: 3, ref last }) if last == "down"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn malformed_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast(5)
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PorterError::Malformed("bad hex".into()))
            })
            .await;
        assert!(matches!(result, Err(PorterError::Malformed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
