//! Bounded fixed-delay retry for single requests.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};

use crate::error::ApiError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn into_backoff(self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are spent.
///
/// Every error kind is retried the same way. The error of the last attempt is
/// returned once the budget is exhausted.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempt = AtomicU32::new(0);

    let run = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    let result = run
        .retry(policy.into_backoff())
        .notify(|err: &ApiError, delay: Duration| {
            tracing::warn!(
                "{} failed (attempt {}/{}): {}; retrying in {:?}",
                label,
                attempt.load(Ordering::SeqCst),
                policy.max_attempts,
                err.short_message(),
                delay
            );
        })
        .await;

    if let Err(err) = &result {
        tracing::error!(
            "{} failed after {} attempt(s): {}",
            label,
            attempt.load(Ordering::SeqCst),
            err
        );
    }

    result
}
