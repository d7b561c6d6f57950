//! Retry with exponential backoff
//!
//! A single combinator wraps any fallible async operation. Call sites never
//! hand-roll their own loops; they describe their errors through
//! [`Retryable`] and let [`retry_with_backoff`] decide.

use crate::config::RetryConfig;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Attempt count and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubled after each further one
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to sleep after failed attempt number `attempt` (1-based)
    ///
    /// `base_delay * 2^(attempt - 1)`, saturating on overflow.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Total sleep when the first `failures` attempts fail and the next succeeds
    pub fn total_backoff(&self, failures: u32) -> Duration {
        (1..=failures).map(|attempt| self.backoff(attempt)).sum()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay())
    }
}

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Failure of a retried operation
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; `last` is the final one
    Exhausted { attempts: u32, last: E },

    /// A non-retryable error ended the loop early
    Permanent(E),
}

impl<E> RetryError<E> {
    /// Returns the underlying error
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent(e) => e,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {} attempts: {}", attempts, last)
            }
            Self::Permanent(e) => write!(f, "{}", e),
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or attempts run out
///
/// `op` receives the 1-based attempt number. Between attempts the task sleeps
/// `policy.backoff(attempt)`; dropping the returned future cancels the sleep.
///
/// # Arguments
///
/// * `policy` - Attempt count and backoff schedule
/// * `label` - Short description used in retry warnings
/// * `op` - The operation to run
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(RetryError::Permanent(e)),
            Err(e) if attempt >= policy.max_attempts => {
                tracing::error!("{}: failed after {} attempts: {}", label, attempt, e);
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                let wait = policy.backoff(attempt);
                tracing::warn!(
                    "{}: attempt {} failed: {}. Retrying in {:.1}s...",
                    label,
                    attempt,
                    e,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
