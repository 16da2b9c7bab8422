//! Bounded retry with linear backoff
//!
//! [`RetryPolicy::run`] wraps one asynchronous operation factory and
//! re-invokes it on failure, waiting a little longer before each attempt.
//! The default schedule is three attempts with delays of 0, 2500 and
//! 5000 ms. The policy bounds attempt count, not wall-clock duration, and
//! never cancels an attempt once started.
//!
//! Each call owns an independent [`RetryContext`]; concurrent calls share
//! nothing.

use crate::error::{HandlerError, RetryError};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Delay added before each further attempt
pub const DEFAULT_DELAY_STEP: Duration = Duration::from_millis(2500);

/// Default number of attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Classification hook deciding which failures are worth another attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryFilter {
    /// Retry every failure (faithful to the original behaviour)
    #[default]
    AllFailures,
    /// Retry only transient remote failures; validation and authentication
    /// errors fail fast
    TransientOnly,
}

impl RetryFilter {
    fn should_retry(self, error: &HandlerError) -> bool {
        match self {
            Self::AllFailures => true,
            Self::TransientOnly => error.is_transient(),
        }
    }
}

/// Per-call retry state; created on entry, discarded on settlement
#[derive(Debug)]
struct RetryContext {
    attempts_remaining: u32,
    delay: Duration,
}

/// Bounded-retry wrapper applied uniformly to handler invocations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    delay_step: Duration,
    filter: RetryFilter,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::ZERO,
            delay_step: DEFAULT_DELAY_STEP,
            filter: RetryFilter::default(),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt bound and default backoff
    #[inline]
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay before the first attempt (defaults to zero)
    #[inline]
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay added per further attempt
    #[inline]
    #[must_use]
    pub fn with_delay_step(mut self, step: Duration) -> Self {
        self.delay_step = step;
        self
    }

    /// Failure classification hook
    #[inline]
    #[must_use]
    pub fn with_filter(mut self, filter: RetryFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Attempt bound
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, fails terminally, or the attempt
    /// bound is reached.
    ///
    /// Attempt *n* is preceded by a delay of
    /// `initial_delay + (n - 1) * delay_step`, so the delay is non-decreasing
    /// across the chain and the first attempt runs immediately under the
    /// default policy.
    ///
    /// # Errors
    /// - [`RetryError::ZeroAttempts`] when the policy allows no attempt;
    ///   `operation` is never invoked.
    /// - [`RetryError::NotRetryable`] when the filter vetoes a retry.
    /// - [`RetryError::Exhausted`] with the last observed error once the
    ///   bound is reached; annotated with `label`.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HandlerError>>,
    {
        if self.max_attempts == 0 {
            return Err(RetryError::ZeroAttempts);
        }

        let mut ctx = RetryContext {
            attempts_remaining: self.max_attempts,
            delay: self.initial_delay,
        };

        loop {
            if !ctx.delay.is_zero() {
                tracing::debug!(label, delay_ms = ctx.delay.as_millis() as u64, "backing off");
                sleep(ctx.delay).await;
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    ctx.attempts_remaining -= 1;

                    if !self.filter.should_retry(&error) {
                        tracing::warn!(label, %error, "failure classified as not retryable");
                        return Err(RetryError::NotRetryable {
                            label: label.to_string(),
                            source: error,
                        });
                    }

                    if ctx.attempts_remaining == 0 {
                        tracing::error!(
                            label,
                            attempts = self.max_attempts,
                            %error,
                            "retries exhausted"
                        );
                        return Err(RetryError::Exhausted {
                            label: label.to_string(),
                            attempts: self.max_attempts,
                            source: error,
                        });
                    }

                    tracing::warn!(
                        label,
                        attempts_remaining = ctx.attempts_remaining,
                        %error,
                        "attempt failed, will retry"
                    );
                    ctx.delay += self.delay_step;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn remote_failure() -> HandlerError {
        HandlerError::Remote("503 service unavailable".into())
    }

    #[tokio::test]
    async fn zero_attempts_rejected_without_invocation() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::new(0)
            .run("probe", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(remote_failure()) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::ZeroAttempts)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_success_needs_one_attempt() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run("probe", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, HandlerError>(42) }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = RetryPolicy::default()
            .run("probe", move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(remote_failure())
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_after_max_attempts_with_linear_delays() {
        let invocations: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&invocations);
        let start = Instant::now();

        let result: Result<(), _> = RetryPolicy::default()
            .run("List Invoices", move || {
                recorder.lock().unwrap().push(start.elapsed());
                async { Err(remote_failure()) }
            })
            .await;

        match result {
            Err(RetryError::Exhausted {
                label, attempts, ..
            }) => {
                assert_eq!(label, "List Invoices");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }

        // Delays before attempts: 0, 2500, 5000 ms (cumulative 0, 2500, 7500)
        let observed = invocations.lock().unwrap().clone();
        assert_eq!(observed.len(), 3);
        assert_eq!(observed[0], Duration::ZERO);
        assert_eq!(observed[1], Duration::from_millis(2500));
        assert_eq!(observed[2], Duration::from_millis(7500));
    }

    #[tokio::test]
    async fn transient_only_filter_fails_fast_on_validation() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::default()
            .with_filter(RetryFilter::TransientOnly)
            .run("Field Region", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(HandlerError::Validation("unknown field type".into())) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::NotRetryable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_only_filter_still_retries_remote_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::default()
            .with_filter(RetryFilter::TransientOnly)
            .run("probe", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(remote_failure()) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Exhausted { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_delay_shifts_the_whole_schedule() {
        let invocations: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&invocations);
        let start = Instant::now();

        let _: Result<(), _> = RetryPolicy::new(2)
            .with_initial_delay(Duration::from_millis(1000))
            .run("probe", move || {
                recorder.lock().unwrap().push(start.elapsed());
                async { Err(remote_failure()) }
            })
            .await;

        let observed = invocations.lock().unwrap().clone();
        assert_eq!(observed[0], Duration::from_millis(1000));
        assert_eq!(observed[1], Duration::from_millis(4500));
    }
}
