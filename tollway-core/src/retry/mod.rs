//! Retry policy and error classification for resilient operations
//!
//! This module decides which failures are transient and retries them with a
//! capped exponential backoff. It works with any error type that implements
//! [`Retryable`], in both async and blocking call styles.

mod classify;
mod error;
mod policy;

pub use classify::{
    is_retryable, Retryable, RetryTag, NON_RETRYABLE_STATUS_CODES, RATE_LIMIT_PHRASES,
    RETRYABLE_STATUS_CODES,
};
pub use error::{RetryError, TaggedError};
pub use policy::{
    retry_async, retry_blocking, RetryExecutor, RetryObserver, RetryPolicy, DEFAULT_BASE_DELAY,
    DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES,
};
