//! Retry with backoff around rate-limited calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use printsync_events::{EventSink, SyncEvent};

use super::{RateDecision, RateLimiter};

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^(attempt - 1)
    #[default]
    Exponential,
    /// Linear backoff: base * attempt
    Linear,
}

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Delay before retry number `attempt` (1-indexed), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.base_delay.saturating_mul(factor)
            }
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
        };
        delay.min(self.max_delay)
    }

    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }
}

/// Whether a failed call is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryHint {
    Permanent,
    /// Retry; honour `retry_after` if the server advised one.
    Transient { retry_after: Option<Duration> },
}

pub trait Retryable {
    fn retry_hint(&self) -> RetryHint;
}

/// The local limiter refused a call and no retries were left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throttled {
    pub api: String,
    pub retry_after: Duration,
}

impl RateLimiter {
    /// Run `op` under the limiter, retrying throttles and transient failures.
    ///
    /// A slot is reserved before every attempt. Local throttles and
    /// transient errors both consume a retry; permanent errors return
    /// immediately. On exhaustion the last error is returned.
    pub async fn with_retry<T, E, F, Fut>(
        &self,
        api: &str,
        policy: &RetryPolicy,
        sink: &dyn EventSink,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display + From<Throttled>,
    {
        let mut retries = 0u32;
        loop {
            if let RateDecision::Throttled { retry_after } = self.check_and_reserve(api) {
                sink.emit(SyncEvent::Throttled {
                    api: api.to_string(),
                    retry_after_ms: retry_after.as_millis() as u64,
                });
                if !policy.should_retry(retries) {
                    return Err(E::from(Throttled {
                        api: api.to_string(),
                        retry_after,
                    }));
                }
                retries += 1;
                tokio::time::sleep(retry_after).await;
                continue;
            }

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let advised = match err.retry_hint() {
                RetryHint::Permanent => return Err(err),
                RetryHint::Transient { retry_after } => retry_after,
            };
            if !policy.should_retry(retries) {
                return Err(err);
            }
            retries += 1;

            let delay = advised.unwrap_or_else(|| policy.delay_for_attempt(retries));
            sink.emit(SyncEvent::RetryScheduled {
                api: api.to_string(),
                attempt: retries,
                delay_ms: delay.as_millis() as u64,
                error: err.to_string(),
            });
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimits;
    use printsync_events::RecordingSink;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Flaky(Option<Duration>),
        Fatal,
        Limited(Duration),
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Retryable for TestError {
        fn retry_hint(&self) -> RetryHint {
            match self {
                TestError::Flaky(retry_after) => RetryHint::Transient {
                    retry_after: *retry_after,
                },
                TestError::Fatal | TestError::Limited(_) => RetryHint::Permanent,
            }
        }
    }

    impl From<Throttled> for TestError {
        fn from(t: Throttled) -> Self {
            TestError::Limited(t.retry_after)
        }
    }

    #[test]
    fn backoff_strategies() {
        let exp = RetryPolicy::exponential(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(exp.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(exp.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(exp.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(exp.delay_for_attempt(3), Duration::from_millis(350));

        let linear = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            strategy: BackoffStrategy::Linear,
        };
        assert_eq!(linear.delay_for_attempt(3), Duration::from_millis(300));

        let fixed = RetryPolicy::fixed(3, Duration::from_millis(250));
        assert_eq!(fixed.delay_for_attempt(7), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let limiter = RateLimiter::new(RateLimits::per_minute(100));
        let sink = RecordingSink::new();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<u32, TestError> = limiter
            .with_retry("catalog", &RetryPolicy::default(), &sink, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TestError::Flaky(None))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(sink.of_type("rate_limit.retry_scheduled").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_error() {
        let limiter = RateLimiter::new(RateLimits::per_minute(100));
        let sink = RecordingSink::new();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), TestError> = limiter
            .with_retry("catalog", &RetryPolicy::fixed(2, Duration::from_secs(1)), &sink, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Flaky(Some(Duration::from_secs(5))))
            })
            .await;

        assert_eq!(result, Err(TestError::Flaky(Some(Duration::from_secs(5)))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let limiter = RateLimiter::new(RateLimits::per_minute(100));
        let sink = RecordingSink::new();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), TestError> = limiter
            .with_retry("catalog", &RetryPolicy::default(), &sink, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            })
            .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_out_local_throttle() {
        let limiter = RateLimiter::new(RateLimits::per_minute(1));
        let sink = RecordingSink::new();
        let start = tokio::time::Instant::now();

        let first: Result<(), TestError> = limiter
            .with_retry("catalog", &RetryPolicy::default(), &sink, || async { Ok(()) })
            .await;
        let second: Result<(), TestError> = limiter
            .with_retry("catalog", &RetryPolicy::default(), &sink, || async { Ok(()) })
            .await;

        assert!(first.is_ok() && second.is_ok());
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(sink.of_type("rate_limit.throttled").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_without_retries_left_is_an_error() {
        let limiter = RateLimiter::new(RateLimits::per_minute(1));
        let sink = RecordingSink::new();
        assert_eq!(limiter.check_and_reserve("catalog"), RateDecision::Allowed);

        let result: Result<(), TestError> = limiter
            .with_retry("catalog", &RetryPolicy::no_retry(), &sink, || async { Ok(()) })
            .await;

        assert_eq!(result, Err(TestError::Limited(Duration::from_secs(60))));
    }
}
