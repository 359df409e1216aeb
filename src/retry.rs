//! Retry with exponential backoff for completion requests.
//!
//! The policy is kept separate from the HTTP transport: which error classes
//! retry, how the delay grows, and the attempt ceiling are all decided by
//! [`RetryPolicy`], and [`run`] drives any async operation under it.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::client::ClientError;
use crate::metrics::Metrics;

/// Next move after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Transient failure with attempts remaining: wait this long, try again.
    Backoff(Duration),
    /// Transient failure, but the attempt budget is spent.
    Exhausted,
    /// Error class that retrying cannot fix; stop immediately.
    Fatal,
}

/// Tracks attempts and the doubling backoff delay across one logical request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            attempts: 0,
            delay: initial_delay,
        }
    }

    /// Records a failed attempt and decides what happens next.
    pub fn on_error(&mut self, error: &ClientError) -> RetryStep {
        self.attempts += 1;

        if !error.is_transient() {
            return RetryStep::Fatal;
        }

        if self.attempts >= self.max_attempts {
            return RetryStep::Exhausted;
        }

        let wait = self.delay;
        self.delay *= 2;
        RetryStep::Backoff(wait)
    }

    /// Attempts consumed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Drives `op` under `policy`: returns the first success, or the last error
/// once the policy gives up.
pub async fn run<T, F, Fut>(mut policy: RetryPolicy, mut op: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => match policy.on_error(&error) {
                RetryStep::Backoff(wait) => {
                    warn!(
                        "Attempt {} failed ({}), retrying in {:?}",
                        policy.attempts(),
                        error,
                        wait
                    );
                    Metrics::record_retry();
                    tokio::time::sleep(wait).await;
                }
                RetryStep::Exhausted => {
                    warn!(
                        "Attempt {} failed ({}), no attempts left",
                        policy.attempts(),
                        error
                    );
                    return Err(error);
                }
                RetryStep::Fatal => return Err(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn rate_limited() -> ClientError {
        ClientError::RateLimited("slow down".to_string())
    }

    #[test]
    fn backoff_doubles_until_exhausted() {
        let mut policy = RetryPolicy::new(3, Duration::from_secs(2));

        assert_eq!(
            policy.on_error(&rate_limited()),
            RetryStep::Backoff(Duration::from_secs(2))
        );
        assert_eq!(
            policy.on_error(&rate_limited()),
            RetryStep::Backoff(Duration::from_secs(4))
        );
        assert_eq!(policy.on_error(&rate_limited()), RetryStep::Exhausted);
        assert_eq!(policy.attempts(), 3);
    }

    #[test]
    fn non_transient_error_is_fatal_on_first_attempt() {
        let mut policy = RetryPolicy::new(3, Duration::from_secs(2));

        let step = policy.on_error(&ClientError::Parse("bad body".to_string()));
        assert_eq!(step, RetryStep::Fatal);
        assert_eq!(policy.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_backoff() {
        let calls = Cell::new(0u32);
        let start = tokio::time::Instant::now();

        let result = run(RetryPolicy::new(3, Duration::from_secs(2)), || {
            let attempt = calls.get() + 1;
            calls.set(attempt);
            async move {
                if attempt < 3 {
                    Err(rate_limited())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
        // 2s after the first failure, 4s after the second
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_exactly_max_attempts() {
        let calls = Cell::new(0u32);

        let result: Result<(), ClientError> =
            run(RetryPolicy::new(3, Duration::from_secs(2)), || {
                calls.set(calls.get() + 1);
                async { Err(rate_limited()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_aborts_without_waiting() {
        let calls = Cell::new(0u32);
        let start = tokio::time::Instant::now();

        let result: Result<(), ClientError> =
            run(RetryPolicy::new(3, Duration::from_secs(2)), || {
                calls.set(calls.get() + 1);
                async { Err(ClientError::Other("boom".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
