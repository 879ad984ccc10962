use super::SummarizationClientError;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff for remote summarization calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one; always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `operation` receives the 1-based attempt number.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, SummarizationClientError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SummarizationClientError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < max_attempts && error.is_retryable() => {
                    let backoff = self.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Summarization call failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Delay slept after failed attempt number `attempt` (1-based), never above `max_backoff`.
    fn delay_after(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_backoff.min(self.max_backoff);
        for _ in 1..attempt {
            delay = delay.saturating_mul(2).min(self.max_backoff);
        }
        delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(SummarizationClientError::ProviderUnavailable("down".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.expect("success"), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(2)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(SummarizationClientError::GenerationFailed {
                        status: StatusCode::SERVICE_UNAVAILABLE,
                        body: "busy".into(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(5)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(SummarizationClientError::GenerationFailed {
                        status: StatusCode::BAD_REQUEST,
                        body: "bad key".into(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delays_double_up_to_the_cap() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..=6).map(|attempt| policy.delay_after(attempt)).collect();
        assert_eq!(
            delays,
            [500, 1000, 2000, 4000, 8000, 8000].map(Duration::from_millis)
        );
    }

    #[test]
    fn oversized_initial_backoff_is_capped_without_overflow() {
        let policy = RetryPolicy {
            max_attempts: 50,
            initial_backoff: Duration::MAX,
            max_backoff: Duration::from_secs(8),
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(8));
        assert_eq!(policy.delay_after(40), Duration::from_secs(8));

        let uncapped = RetryPolicy {
            max_attempts: 50,
            initial_backoff: Duration::from_secs(u64::MAX / 2),
            max_backoff: Duration::MAX,
        };
        assert_eq!(uncapped.delay_after(3), Duration::MAX);
    }
}
