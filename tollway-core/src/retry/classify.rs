//! Transient vs. permanent failure classification

use std::io;
use std::time::Duration;

/// HTTP status codes that should trigger a retry
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [
    429, // Rate limit
    500, // Internal server error
    502, // Bad gateway
    503, // Service unavailable
    504, // Gateway timeout
];

/// HTTP status codes that should never be retried
pub const NON_RETRYABLE_STATUS_CODES: [u16; 4] = [
    400, // Bad request
    401, // Unauthorized
    403, // Forbidden
    404, // Not found
];

/// Lowercase message fragments that identify a rate-limit failure
pub const RATE_LIMIT_PHRASES: [&str; 3] = ["rate limit", "too many requests", "429"];

/// Explicit retry marker carried by an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTag {
    /// Always retry
    Retryable,
    /// Never retry
    NonRetryable,
}

/// View of an error that the classifier can inspect.
///
/// Every method has a neutral default so an implementation only describes
/// what it actually knows about the failure.
pub trait Retryable: std::error::Error {
    /// Explicit retry marker, if the error carries one
    fn retry_tag(&self) -> Option<RetryTag> {
        None
    }

    /// HTTP status of the response that caused the failure
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Whether the failure happened before any response was received
    fn is_connection_failure(&self) -> bool {
        false
    }

    /// Server-supplied delay before the next attempt
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Determine if an error should trigger a retry.
///
/// Checks, in order: explicit tags, HTTP status, connection/timeout failures,
/// and finally rate-limit wording in the message. Unknown errors are not
/// retried.
pub fn is_retryable<E: Retryable + ?Sized>(error: &E) -> bool {
    match error.retry_tag() {
        Some(RetryTag::Retryable) => return true,
        Some(RetryTag::NonRetryable) => return false,
        None => {}
    }

    if let Some(status) = error.status_code() {
        return RETRYABLE_STATUS_CODES.contains(&status);
    }

    if error.is_connection_failure() {
        return true;
    }

    let message = error.to_string().to_lowercase();
    RATE_LIMIT_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
}

impl Retryable for io::Error {
    fn is_connection_failure(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::TimedOut
        )
    }
}
