//! Provider error types

use crate::http::TransportError;
use crate::retry::{RetryTag, Retryable, TaggedError};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by provider clients
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The client could not be built or is missing a setting
    #[error("{provider} client misconfigured: {message}")]
    Configuration { provider: String, message: String },

    /// The request failed at the transport level or returned a failure status
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: TransportError,
    },

    /// The vendor answered with a body we could not interpret
    #[error("Unexpected response from {provider}: {message}")]
    UnexpectedResponse { provider: String, message: String },

    /// Every retry failed; carries the last failure
    #[error("max retries ({max_retries}) exceeded: {source}")]
    RetriesExhausted {
        max_retries: u32,
        #[source]
        source: Box<ProviderError>,
    },

    /// An explicitly tagged failure (used by test doubles and wrappers)
    #[error(transparent)]
    Tagged(#[from] TaggedError),
}

impl ProviderError {
    pub(crate) fn configuration(provider: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn unexpected(provider: &str, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn transport(provider: &str, source: TransportError) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            source,
        }
    }

    /// HTTP status of the failed response, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl Retryable for ProviderError {
    fn retry_tag(&self) -> Option<RetryTag> {
        match self {
            Self::Configuration { .. }
            | Self::UnexpectedResponse { .. }
            | Self::RetriesExhausted { .. } => Some(RetryTag::NonRetryable),
            Self::Tagged(tagged) => tagged.retry_tag(),
            Self::Transport { source, .. } => source.retry_tag(),
        }
    }

    fn status_code(&self) -> Option<u16> {
        self.status()
    }

    fn is_connection_failure(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_connection_failure(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transport { source, .. } => source.retry_after(),
            _ => None,
        }
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{map_http_error, HttpResponse};
    use crate::retry::is_retryable;

    #[test]
    fn test_classification_delegates_to_transport() {
        let limited = ProviderError::transport("openai", map_http_error("u", &HttpResponse::new(429)));
        assert!(is_retryable(&limited));

        let unauthorized =
            ProviderError::transport("openai", map_http_error("u", &HttpResponse::new(401)));
        assert!(!is_retryable(&unauthorized));

        let reset = ProviderError::transport(
            "openai",
            TransportError::Connect {
                message: "reset".into(),
            },
        );
        assert!(is_retryable(&reset));
    }

    #[test]
    fn test_configuration_is_never_retried() {
        let err = ProviderError::configuration("google", "rate limit of base url parser");
        assert!(!is_retryable(&err));
        assert!(is_retryable(&ProviderError::from(TaggedError::retryable("Rate limited"))));
    }

    #[test]
    fn test_source_chain_reaches_transport() {
        use std::error::Error;
        let err = ProviderError::transport("grok", TransportError::Timeout {
            message: "deadline".into(),
        });
        assert!(err.source().unwrap().to_string().contains("deadline"));
    }
}
