use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tokio::time::sleep;

pub const MAX_ATTEMPTS: u32 = 3;
pub const BASE_DELAY_MS: u64 = 500;
const JITTER_MAX_MS: u64 = 150;

/// Returned once a transient failure survived every allowed attempt,
/// so callers can tell "gave up" apart from "failed outright".
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed after {attempts} attempts: {last_error}")]
pub struct RetriesExhausted {
    pub operation: String,
    pub attempts: u32,
    pub last_error: String,
}

/// Bounded exponential backoff with jitter.
///
/// Delay before retry `n` is `base · 2^(n-1)` plus up to 150 ms of jitter.
/// Terminal errors (classified by message substring) are returned
/// immediately; only transient ones are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(exponent));
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=JITTER_MAX_MS));
        backoff.saturating_add(jitter)
    }

    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_attempts {
                        return Err(RetriesExhausted {
                            operation: operation_name.to_string(),
                            attempts: attempt,
                            last_error: format!("{err:#}"),
                        }
                        .into());
                    }
                    if !is_transient(&err) {
                        return Err(err);
                    }

                    log::warn!(
                        "{operation_name} failed (attempt {attempt}/{}), retrying: {err:#}",
                        self.max_attempts
                    );
                    sleep(self.delay_for(attempt)).await;
                }
            }
        }
    }
}

/// Transient-vs-terminal classification by message substring. Like the
/// decompression-output classifier, this is a heuristic: stores that
/// surface typed errors should be classified upstream.
pub fn is_transient(err: &anyhow::Error) -> bool {
    let message = format!("{err:#}").to_lowercase();
    message.contains("timeout")
        || message.contains("timed out")
        || message.contains("connection")
        || message.contains("temporarily")
        || message.contains("too many requests")
        || message.contains("service unavailable")
        || message.contains("rate limit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn delay_doubles_per_attempt_with_bounded_jitter() {
        let policy = RetryPolicy::default();

        for (attempt, base_ms) in [(1u32, 500u64), (2, 1000), (3, 2000), (4, 4000)] {
            let delay = policy.delay_for(attempt);
            assert!(
                delay >= Duration::from_millis(base_ms),
                "attempt {attempt}: {delay:?} below base"
            );
            assert!(
                delay <= Duration::from_millis(base_ms + 150),
                "attempt {attempt}: {delay:?} above base + jitter"
            );
        }
    }

    #[test]
    fn transient_classification_by_substring() {
        assert!(is_transient(&anyhow::anyhow!("request timed out")));
        assert!(is_transient(&anyhow::anyhow!("Connection reset by peer")));
        assert!(is_transient(&anyhow::anyhow!("429 Too Many Requests")));
        assert!(!is_transient(&anyhow::anyhow!("permission denied")));
        assert!(!is_transient(&anyhow::anyhow!("object already exists")));
    }

    #[tokio::test]
    async fn immediate_success_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = fast_policy()
            .run("op", move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<u32, anyhow::Error>(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = fast_policy()
            .run("op", move || {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(anyhow::anyhow!("connection refused"))
                    } else {
                        Ok::<u32, anyhow::Error>(7)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_failure_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let err = fast_policy()
            .run("op", move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, anyhow::Error>(anyhow::anyhow!("permission denied"))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(err.downcast_ref::<RetriesExhausted>().is_none());
    }

    #[tokio::test]
    async fn exhausted_retries_are_distinguishable() {
        let err = fast_policy()
            .run("delete batch", || async {
                Err::<(), anyhow::Error>(anyhow::anyhow!("request timed out"))
            })
            .await
            .unwrap_err();

        let exhausted = err
            .downcast_ref::<RetriesExhausted>()
            .expect("expected RetriesExhausted");
        assert_eq!(exhausted.attempts, 3);
        assert!(exhausted.last_error.contains("timed out"));
    }
}
