//! Token bucket rate limiting

use crate::config::{ConfigError, ValidationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Sustained request rate (tokens added per second)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Bucket capacity; defaults to the integer part of the rate (at least 1)
    #[serde(default)]
    pub burst_size: Option<u32>,
}

/// Slowest accepted rate; one token per roughly eleven and a half days
pub const MIN_REQUESTS_PER_SECOND: f64 = 1e-6;

fn default_requests_per_second() -> f64 {
    10.0
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: None,
        }
    }
}

impl RateLimitConfig {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            requests_per_second,
            burst_size: None,
        }
    }

    pub fn with_burst(mut self, burst_size: u32) -> Self {
        self.burst_size = Some(burst_size);
        self
    }

    /// Effective bucket capacity
    pub fn capacity(&self) -> u32 {
        self.burst_size
            .unwrap_or_else(|| (self.requests_per_second as u32).max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(ValidationError::out_of_range(
                "rate_limit.requests_per_second",
                format!(
                    "must be a positive number, got {}",
                    self.requests_per_second
                ),
            )
            .into());
        }
        if self.requests_per_second < MIN_REQUESTS_PER_SECOND {
            return Err(ValidationError::out_of_range(
                "rate_limit.requests_per_second",
                format!(
                    "must be at least {}, got {}",
                    MIN_REQUESTS_PER_SECOND, self.requests_per_second
                ),
            )
            .into());
        }
        if self.burst_size == Some(0) {
            return Err(ValidationError::out_of_range(
                "rate_limit.burst_size",
                "burst size must be at least 1",
            )
            .into());
        }
        Ok(())
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    /// Time up to which refills have been accounted for. Runs ahead of the
    /// clock while waiting callers hold reservations.
    last_refill: Instant,
}

/// Token bucket limiter shared by concurrent callers.
///
/// The refill-and-decide step runs under a mutex; the lock is released before
/// any sleep. A caller that finds the bucket empty reserves the next token by
/// moving `last_refill` forward, so concurrent waiters queue up one refill
/// interval apart instead of being admitted together.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Create a limiter with a full bucket
    pub fn new(config: RateLimitConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = f64::from(config.capacity());
        Ok(Self {
            rate: config.requests_per_second,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Shorthand for [`RateLimiter::new`] with a default burst
    pub fn per_second(requests_per_second: f64) -> Result<Self, ConfigError> {
        Self::new(RateLimitConfig::new(requests_per_second))
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    /// Wait until a token is available, then consume it
    pub async fn acquire(&self) {
        let wait = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            self.refill(&mut state, now);

            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                None
            } else {
                let deficit = Duration::from_secs_f64((1.0 - state.tokens) / self.rate);
                let ready_at = state.last_refill.max(now) + deficit;
                state.tokens = 0.0;
                state.last_refill = ready_at;
                Some(ready_at - now)
            }
        };

        if let Some(wait) = wait {
            debug!("Rate limit: waiting {:.2}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }

    /// Consume a token if one is available right now
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently in the bucket
    pub async fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());
        state.tokens
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        if now > state.last_refill {
            let elapsed = (now - state.last_refill).as_secs_f64();
            state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
            state.last_refill = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_defaults_to_rate() {
        assert_eq!(RateLimitConfig::new(5.0).capacity(), 5);
        assert_eq!(RateLimitConfig::new(0.5).capacity(), 1);
        assert_eq!(RateLimitConfig::new(5.0).with_burst(20).capacity(), 20);
        assert_eq!(RateLimitConfig::default().capacity(), 10);
    }

    #[test]
    fn test_config_validation() {
        assert!(RateLimitConfig::new(0.0).validate().is_err());
        assert!(RateLimitConfig::new(f64::NAN).validate().is_err());
        assert!(RateLimitConfig::new(1.0).with_burst(0).validate().is_err());
        assert!(RateLimiter::per_second(-3.0).is_err());
    }

    #[test]
    fn test_tiny_rates_are_rejected() {
        assert!(RateLimitConfig::new(1e-20).validate().is_err());
        assert!(RateLimitConfig::new(f64::MIN_POSITIVE).validate().is_err());
        assert!(RateLimitConfig::new(MIN_REQUESTS_PER_SECOND).validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slowest_rate_waits_without_overflow() {
        let limiter = RateLimiter::per_second(MIN_REQUESTS_PER_SECOND).unwrap();
        limiter.acquire().await;

        let mut waiter = tokio_test::task::spawn(limiter.acquire());
        tokio_test::assert_pending!(waiter.poll());
        tokio::time::advance(Duration::from_secs(1_000_001)).await;
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_wait() {
        let limiter = RateLimiter::per_second(5.0).unwrap();
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        let waited = start.elapsed().as_secs_f64();
        assert!((waited - 0.2).abs() < 0.01, "waited {waited}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_stays_pending_until_reservation() {
        let limiter = RateLimiter::new(RateLimitConfig::new(10.0).with_burst(1)).unwrap();
        limiter.acquire().await;

        let mut waiter = tokio_test::task::spawn(limiter.acquire());
        tokio_test::assert_pending!(waiter.poll());

        tokio::time::advance(Duration::from_millis(50)).await;
        tokio_test::assert_pending!(waiter.poll());

        tokio::time::advance(Duration::from_millis(60)).await;
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_and_refill() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2.0).with_burst(1)).unwrap();

        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!((limiter.available_tokens().await - 1.0).abs() < 1e-9);

        // Never refills above capacity
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!((limiter.available_tokens().await - 1.0).abs() < 1e-9);
    }
}
