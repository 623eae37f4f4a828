//! Bounded fixed-interval retry for API mutations.
//!
//! Every create and update issued by the controller runs through
//! [`retry_mutate`]. The attempt closure decides per error whether another try
//! can help by returning one of the [`Attempt`] variants; the loop itself
//! only enforces the interval and the overall deadline.
//!
//! # Example
//!
//! ```ignore
//! let created = retry_mutate(&config.retry, "create ConfigMap", || async {
//!     match store.create(&cm).await {
//!         Ok(cm) => Attempt::Done(cm),
//!         Err(e) if is_already_exists(&e) => Attempt::Abort(e.into()),
//!         Err(e) => Attempt::Retry(Some(e.into())),
//!     }
//! })
//! .await?;
//! ```

use std::future::Future;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::controller::error::{Error, Result};

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    /// The mutation went through; stop with this value.
    Done(T),
    /// Stop without success. Retrying cannot change the answer, so the error
    /// is returned as-is.
    Abort(Error),
    /// Possibly transient; try again after the interval. The error, when
    /// present, is kept as the last error seen.
    Retry(Option<Error>),
}

/// Run `attempt` immediately, then every `policy.interval`, until it returns
/// [`Attempt::Done`] or [`Attempt::Abort`].
///
/// Once `policy.timeout` has elapsed without a decisive result the call fails
/// with [`Error::Timeout`] carrying the last error seen. The deadline is
/// checked only after an attempt, so the timeout is never reported early.
pub async fn retry_mutate<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    if policy.interval.is_zero() {
        return Err(Error::InvalidArgument(format!(
            "retry interval for {} must be greater than zero",
            operation
        )));
    }

    let started = Instant::now();
    let mut attempts = 0u32;
    let mut last_error: Option<Error> = None;

    loop {
        attempts += 1;

        match attempt().await {
            Attempt::Done(value) => {
                if attempts > 1 {
                    debug!(operation = %operation, attempts, "Operation succeeded after retries");
                }
                return Ok(value);
            }
            Attempt::Abort(e) => return Err(e),
            Attempt::Retry(e) => {
                if let Some(e) = e {
                    last_error = Some(e);
                }
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.timeout {
            warn!(
                operation = %operation,
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "Operation timed out"
            );
            return Err(Error::Timeout {
                operation: operation.to_string(),
                timeout: policy.timeout,
                source: last_error.map(Box::new),
            });
        }

        let remaining = policy.timeout - elapsed;
        tokio::time::sleep(policy.interval.min(remaining)).await;
    }
}
