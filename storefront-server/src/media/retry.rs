//! Bounded retry for store calls
//!
//! In-request work (metadata chunks, blob deletes) uses a fixed pause; the
//! cleanup worker reuses [`Backoff::delay_for`] to spread out rescheduled
//! deletions.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ConstantBuilder, ExponentialBuilder, Retryable};
use tracing::warn;

/// Pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same pause every time
    Fixed(Duration),
    /// Doubling pause starting at `base`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Pause after the `failures`-th consecutive failure (1-based)
    pub fn delay_for(&self, failures: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let shift = failures.saturating_sub(1).min(31);
                base.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

/// Retry policy: how many attempts in total and how long to wait between them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: usize,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    /// Three attempts, one second apart
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: usize, pause: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(pause),
        }
    }

    /// No pause between attempts
    pub const fn immediate(max_attempts: usize) -> Self {
        Self::fixed(max_attempts, Duration::ZERO)
    }

    fn retries(&self) -> usize {
        self.max_attempts.max(1) - 1
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts. The last error is returned as-is.
    pub async fn run<F, Fut, T, E, R>(
        &self,
        operation_name: &str,
        operation: F,
        is_retryable: R,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        R: Fn(&E) -> bool,
    {
        match self.backoff {
            Backoff::Fixed(pause) => {
                let builder = ConstantBuilder::default()
                    .with_delay(pause)
                    .with_max_times(self.retries());
                run_with(builder, self.max_attempts, operation_name, operation, is_retryable).await
            }
            Backoff::Exponential { base, max } => {
                let builder = ExponentialBuilder::default()
                    .with_min_delay(base)
                    .with_max_delay(max)
                    .with_max_times(self.retries());
                run_with(builder, self.max_attempts, operation_name, operation, is_retryable).await
            }
        }
    }
}

async fn run_with<B, F, Fut, T, E, R>(
    backoff: B,
    max_attempts: usize,
    operation_name: &str,
    operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    B: BackoffBuilder,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0usize;
    let notify = |err: &E, dur: Duration| {
        attempt += 1;
        warn!(
            operation = %operation_name,
            attempt,
            max_attempts,
            next_delay_ms = dur.as_millis() as u64,
            error = %err,
            "Operation failed, will retry"
        );
    };

    operation
        .retry(backoff)
        .when(move |e| is_retryable(e))
        .notify(notify)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Flaky(bool);

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky (transient: {})", self.0)
        }
    }

    #[tokio::test]
    async fn succeeds_on_last_attempt() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let result = RetryPolicy::immediate(3)
            .run(
                "test",
                || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 { Err(Flaky(true)) } else { Ok(n) }
                },
                |e: &Flaky| e.0,
            )
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let result: Result<(), Flaky> = RetryPolicy::immediate(3)
            .run(
                "test",
                || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Flaky(true))
                },
                |e: &Flaky| e.0,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let result: Result<(), Flaky> = RetryPolicy::immediate(5)
            .run(
                "test",
                || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Flaky(false))
                },
                |e: &Flaky| e.0,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_is_three_attempts_one_second_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_secs(1)));
    }

    #[test]
    fn exponential_delay_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_secs(30),
            max: Duration::from_secs(600),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_secs(30));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(60));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(120));
        assert_eq!(backoff.delay_for(10), Duration::from_secs(600));
        assert_eq!(backoff.delay_for(200), Duration::from_secs(600));
    }
}
