#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Connection Retry
//!
//! Retry policy with exponential backoff for opening the connection to the
//! target. Only connection setup is retried; once a session exists, every
//! failure is an observable output for the learner.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::{ErrorCode, OracleError};

/// Retry configuration for connection setup
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Enable jitter
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    #[must_use]
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Default::default() }
    }

    /// Create custom retry policy
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), initial_backoff, max_backoff, jitter: true }
    }

    /// Disable jitter, making backoff durations deterministic
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Calculate backoff duration for a given attempt
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        // Exponent capped so the shift cannot overflow
        let exponent = attempt.saturating_sub(1).min(10);

        let initial_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let multiplier = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let delay_ms = initial_ms.saturating_mul(multiplier);

        let max_ms = u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX);
        let capped_delay_ms = delay_ms.min(max_ms);

        if self.jitter {
            // 0-50% on top of the capped delay
            let jitter_pct = rand::random::<u64>() % 50;
            let jitter_ms = capped_delay_ms.saturating_mul(jitter_pct) / 100;
            Duration::from_millis(capped_delay_ms.saturating_add(jitter_ms))
        } else {
            Duration::from_millis(capped_delay_ms)
        }
    }

    /// Check if error should be retried
    #[must_use]
    pub fn should_retry(&self, err: &OracleError, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }

        match err {
            OracleError::Transport { code, .. } => matches!(
                code,
                ErrorCode::ConnectionRefused
                    | ErrorCode::ConnectionTimeout
                    | ErrorCode::ConnectionReset
            ),
            _ => false,
        }
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy is exhausted
///
/// # Errors
///
/// Returns the last error produced by `operation`.
pub async fn retry_with_policy<F, Fut, T>(
    policy: &RetryPolicy,
    mut operation: F,
    operation_name: &str,
) -> Result<T, OracleError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OracleError>>,
{
    let mut attempt = 1;
    loop {
        debug!("{} attempt {} of {}", operation_name, attempt, policy.max_attempts);

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!("{} succeeded on attempt {} after retry", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !policy.should_retry(&err, attempt) {
                    if attempt >= policy.max_attempts && policy.max_attempts > 1 {
                        error!("{} failed after {} attempts", operation_name, attempt);
                    } else {
                        warn!("{} error not retryable: {}", operation_name, err);
                    }
                    return Err(err);
                }

                let backoff = policy.backoff_for_attempt(attempt);
                info!(
                    "{} failed on attempt {} ({}), retrying after {:?}",
                    operation_name,
                    attempt,
                    err.code(),
                    backoff
                );
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationPhase;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_retry_policy_backoff_without_jitter() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(300))
            .without_jitter();
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(300));
    }

    #[test]
    fn test_should_retry_only_connection_errors() {
        let policy = RetryPolicy::default();
        let refused = OracleError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(policy.should_retry(&refused, 1));
        assert!(!policy.should_retry(&refused, 3));

        let config = OracleError::config("x", "bad", ErrorCode::InvalidConfig);
        assert!(!policy.should_retry(&config, 1));
    }

    #[tokio::test]
    async fn test_retry_with_policy_eventually_succeeds() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2));
        let calls = AtomicU32::new(0);

        let result = retry_with_policy(
            &policy,
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(OracleError::transport(
                        "refused",
                        ErrorCode::ConnectionRefused,
                        OperationPhase::ConnectionSetup,
                    ))
                } else {
                    Ok(7)
                }
            },
            "connect",
        )
        .await;

        assert_eq!(result.ok(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_with_policy_gives_up() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_policy(
            &policy,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(OracleError::transport(
                    "refused",
                    ErrorCode::ConnectionRefused,
                    OperationPhase::ConnectionSetup,
                ))
            },
            "connect",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
