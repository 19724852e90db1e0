//! Bounded retry with a fixed delay between attempts
//!
//! Both the startup connection loop and the backend notifier retry a
//! fallible async operation a fixed number of times. The interval is
//! driven by `backoff` with a flat multiplier and no jitter.

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::warn;

use crate::error::Error;

/// Attempt cap and inter-attempt delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.delay)
            .with_max_interval(self.delay)
            .with_multiplier(1.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Run `operation` until it succeeds or the policy runs out of attempts
///
/// The closure receives the 1-based attempt number. Errors for which
/// `is_permanent` returns true stop the loop immediately. On exhaustion the
/// last error is wrapped in [`Error::RetriesExhausted`].
pub async fn retry_bounded<T, E, F, Fut, P>(
    policy: RetryPolicy,
    label: &str,
    is_permanent: P,
    mut operation: F,
) -> Result<T, Error>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let attempts = AtomicU32::new(0);

    let result = backoff::future::retry_notify(
        policy.backoff(),
        || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let fut = operation(attempt);
            let is_permanent = &is_permanent;
            async move {
                fut.await.map_err(|e| {
                    if attempt >= policy.max_attempts || is_permanent(&e) {
                        backoff::Error::permanent(e)
                    } else {
                        backoff::Error::transient(e)
                    }
                })
            }
        },
        |e: E, wait: Duration| {
            warn!(
                operation = label,
                attempt = attempts.load(Ordering::SeqCst),
                max_attempts = policy.max_attempts,
                retry_in_ms = wait.as_millis() as u64,
                error = %e,
                "Attempt failed, retrying"
            );
        },
    )
    .await;

    result.map_err(|e| Error::RetriesExhausted {
        attempts: attempts.load(Ordering::SeqCst),
        last_error: e.to_string(),
    })
}
