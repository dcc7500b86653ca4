//! Retry outcome and marker error types

use super::classify::{RetryTag, Retryable};
use thiserror::Error;

/// Failure returned by a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The error was classified as permanent and returned without retrying
    #[error(transparent)]
    Aborted(E),

    /// Every allowed attempt failed with a transient error
    #[error("max retries ({max_retries}) exceeded: {source}")]
    Exhausted {
        max_retries: u32,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    /// Whether the retry budget was used up
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Borrow the error of the final attempt
    pub fn inner(&self) -> &E {
        match self {
            Self::Aborted(error) => error,
            Self::Exhausted { source, .. } => source,
        }
    }

    /// Take the error of the final attempt
    pub fn into_inner(self) -> E {
        match self {
            Self::Aborted(error) => error,
            Self::Exhausted { source, .. } => source,
        }
    }
}

/// An error explicitly marked as retryable or non-retryable.
///
/// ```
/// use tollway_core::retry::{is_retryable, TaggedError};
///
/// assert!(is_retryable(&TaggedError::retryable("Rate limited, try again later")));
/// assert!(!is_retryable(&TaggedError::non_retryable("Invalid API key")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaggedError {
    tag: RetryTag,
    message: String,
}

impl TaggedError {
    /// Failure caused by a transient issue that may succeed on retry
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            tag: RetryTag::Retryable,
            message: message.into(),
        }
    }

    /// Failure caused by a permanent issue that will not succeed on retry
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            tag: RetryTag::NonRetryable,
            message: message.into(),
        }
    }

    pub fn tag(&self) -> RetryTag {
        self.tag
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Retryable for TaggedError {
    fn retry_tag(&self) -> Option<RetryTag> {
        Some(self.tag)
    }
}
