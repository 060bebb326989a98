use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One attempt of a retried operation, borrowing its target for `'a`
pub type Attempt<'a, T> = Pin<Box<dyn Future<Output = Result<T, DomainError>> + Send + 'a>>;

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(10),
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

    /// Number of attempts actually made; never less than one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `op` against `target` until it succeeds or attempts are exhausted
    ///
    /// Each attempt gets a fresh mutable borrow of `target`. Exhaustion is
    /// reported as [`DomainError::Hardware`] carrying the last failure.
    pub async fn run<T, R, F>(&self, what: &str, target: &mut T, mut op: F) -> Result<R, DomainError>
    where
        T: ?Sized,
        F: for<'a> FnMut(&'a mut T) -> Attempt<'a, R>,
    {
        let attempts = self.attempts();
        let mut last_error = None;
        for attempt in 1..=attempts {
            match op(&mut *target).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt < attempts {
                        tracing::debug!(operation = %what, attempt, error = %e, "Bus operation failed, retrying");
                        if !self.delay.is_zero() {
                            tokio::time::sleep(self.delay).await;
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());
        tracing::error!(operation = %what, attempts, error = %reason, "Bus operation failed after retries");
        Err(DomainError::Hardware(format!(
            "{what} failed after {attempts} attempts: {reason}"
        )))
    }
}
