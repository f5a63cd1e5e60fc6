//! Retry policy and the generic retry combinator.
//!
//! The backoff strategy is a value ([`Backoff`]) rather than inline control
//! flow, so callers choose it through configuration.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delay applied after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Same delay after every failure.
    Fixed { delay: Duration },
    /// `attempt * base` after the n-th failure.
    Linear { base: Duration },
}

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Treated as at least 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, base: Duration) -> Self {
        Self { max_attempts, backoff: Backoff::Linear { base } }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, backoff: Backoff::Fixed { delay } }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, backoff: Backoff::None }
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay } => delay,
            Backoff::Linear { base } => base.saturating_mul(attempt),
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Final failure after the policy ran out of attempts.
#[derive(Debug, Clone)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number. Each failure is logged with the
/// given `target` label before the backoff delay.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, target: &str, mut op: F) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::warn!(target, attempt, max_attempts, error = %err, "attempt failed");
                if attempt >= max_attempts {
                    return Err(RetryExhausted { attempts: attempt, last: err });
                }
                let delay = policy.delay_after(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
