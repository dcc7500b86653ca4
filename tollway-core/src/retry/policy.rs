//! Exponential backoff retry policy and executor

use super::classify::{is_retryable, Retryable};
use super::error::RetryError;
use crate::config::{ConfigError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of retries after the initial attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for a single delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not including the initial attempt)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay between retries (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY.as_millis() as u64
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY.as_millis() as u64
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given retry count and default delays
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Set the delay bounds
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay_ms = base_delay.as_millis() as u64;
        self.max_delay_ms = max_delay.as_millis() as u64;
        self
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Check the policy invariants: a positive base delay no larger than the cap
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_delay_ms == 0 {
            return Err(ValidationError::out_of_range(
                "retry.base_delay_ms",
                "base delay must be greater than zero",
            )
            .into());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ValidationError::out_of_range(
                "retry.max_delay_ms",
                format!(
                    "max delay {}ms is smaller than base delay {}ms",
                    self.max_delay_ms, self.base_delay_ms
                ),
            )
            .into());
        }
        Ok(())
    }

    /// Calculate the delay before retry `attempt` (0-indexed).
    ///
    /// A server-supplied hint replaces the exponential delay but is still
    /// capped at `max_delay`.
    pub fn calculate_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let max_delay = self.max_delay();

        if let Some(hint) = hint {
            if hint > max_delay {
                warn!(
                    "Server requested {:.1}s retry delay, capping at {:.1}s",
                    hint.as_secs_f64(),
                    max_delay.as_secs_f64()
                );
                return max_delay;
            }
            return hint;
        }

        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = self.base_delay_ms as f64 * 2f64.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay_ms as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

/// Callback invoked before each retry sleep with `(attempt, error, delay)`.
///
/// `attempt` is 1-based: the first retry reports 1.
pub type RetryObserver = Arc<dyn Fn(u32, &dyn std::error::Error, Duration) + Send + Sync>;

/// Executor for retry operations
#[derive(Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    observer: Option<RetryObserver>,
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RetryExecutor {
    /// Create a new retry executor with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: None,
        }
    }

    /// Replace the default debug log line with a callback
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &dyn std::error::Error, Duration) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an async operation, retrying errors that [`is_retryable`] accepts
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        self.execute_with(operation, is_retryable::<E>).await
    }

    /// Execute an async operation with a custom retry predicate
    pub async fn execute_with<F, Fut, T, E, C>(
        &self,
        mut operation: F,
        classify: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
        C: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let delay = self.next_delay(attempt, error, &classify)?;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Execute a blocking operation, retrying errors that [`is_retryable`] accepts.
    ///
    /// Sleeps the calling thread between attempts.
    pub fn execute_blocking<F, T, E>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Retryable,
    {
        self.execute_blocking_with(operation, is_retryable::<E>)
    }

    /// Execute a blocking operation with a custom retry predicate
    pub fn execute_blocking_with<F, T, E, C>(
        &self,
        mut operation: F,
        classify: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Retryable,
        C: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let delay = self.next_delay(attempt, error, &classify)?;
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Decide what happens after a failed attempt: the delay to sleep, or the
    /// error to surface.
    fn next_delay<E, C>(
        &self,
        attempt: u32,
        error: E,
        classify: &C,
    ) -> Result<Duration, RetryError<E>>
    where
        E: Retryable,
        C: Fn(&E) -> bool,
    {
        if !classify(&error) {
            return Err(RetryError::Aborted(error));
        }

        let max_retries = self.policy.max_retries;
        if attempt >= max_retries {
            warn!("Max retries ({}) exceeded: {}", max_retries, error);
            return Err(RetryError::Exhausted {
                max_retries,
                source: error,
            });
        }

        let delay = self.policy.calculate_delay(attempt, error.retry_after());
        match &self.observer {
            Some(observer) => observer(attempt + 1, &error, delay),
            None => debug!(
                "Retry {}/{} after {:.1}s: {}",
                attempt + 1,
                max_retries,
                delay.as_secs_f64(),
                error
            ),
        }
        Ok(delay)
    }
}

/// Execute an async operation under `policy` (one-off wrapper)
pub async fn retry_async<F, Fut, T, E>(
    policy: RetryPolicy,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    RetryExecutor::new(policy).execute(operation).await
}

/// Execute a blocking operation under `policy` (one-off wrapper)
pub fn retry_blocking<F, T, E>(policy: RetryPolicy, operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    E: Retryable,
{
    RetryExecutor::new(policy).execute_blocking(operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::TaggedError;
    use std::sync::Mutex;

    fn secs(policy: &RetryPolicy, attempt: u32) -> f64 {
        policy.calculate_delay(attempt, None).as_secs_f64()
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay(), Duration::from_secs(1));
        assert_eq!(policy.max_delay(), Duration::from_secs(30));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_exponential_backoff_calculation() {
        let policy =
            RetryPolicy::new(5).with_delays(Duration::from_secs(1), Duration::from_secs(30));

        let delays: Vec<f64> = (0..6).map(|attempt| secs(&policy, attempt)).collect();
        assert_eq!(delays, vec![1.0, 2.0, 4.0, 8.0, 16.0, 30.0]);
    }

    #[test]
    fn test_huge_attempt_stays_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.calculate_delay(u32::MAX, None), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_after_hint_overrides_and_is_clamped() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.calculate_delay(3, Some(Duration::from_millis(1500))),
            Duration::from_millis(1500)
        );
        assert_eq!(
            policy.calculate_delay(0, Some(Duration::from_secs(3600))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let zero_base = RetryPolicy {
            base_delay_ms: 0,
            ..Default::default()
        };
        assert!(zero_base.validate().is_err());

        let inverted =
            RetryPolicy::default().with_delays(Duration::from_secs(5), Duration::from_secs(1));
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_blocking_observer_sees_each_retry() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let executor = RetryExecutor::new(
            RetryPolicy::new(2).with_delays(Duration::from_millis(1), Duration::from_millis(2)),
        )
        .with_observer(move |attempt, error, delay| {
            recorder
                .lock()
                .unwrap()
                .push((attempt, error.to_string(), delay));
        });

        let mut calls = 0;
        let result: Result<(), _> = executor.execute_blocking(|| {
            calls += 1;
            Err(TaggedError::retryable("Rate limited"))
        });

        assert!(result.unwrap_err().is_exhausted());
        assert_eq!(calls, 3);
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (1, "Rate limited".to_string(), Duration::from_millis(1)),
                (2, "Rate limited".to_string(), Duration::from_millis(2)),
            ]
        );
    }

    #[test]
    fn test_blocking_custom_classifier() {
        let executor = RetryExecutor::new(
            RetryPolicy::new(3).with_delays(Duration::from_millis(1), Duration::from_millis(1)),
        );

        let mut calls = 0;
        let result = executor.execute_blocking_with(
            || {
                calls += 1;
                if calls < 3 {
                    Err(TaggedError::non_retryable("flaky but marked permanent"))
                } else {
                    Ok(calls)
                }
            },
            |_| true,
        );

        assert_eq!(result.unwrap(), 3);
    }
}
