//! HTTP error types and mapping utilities

use super::HttpResponse;
use crate::retry::Retryable;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Failures raised by the transport layer
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status
    #[error("HTTP {status} from {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
        /// Parsed `Retry-After` hint, if the server sent one
        retry_after: Option<Duration>,
        headers: HashMap<String, String>,
        body: String,
    },

    #[error("Connection failed: {message}")]
    Connect { message: String },

    #[error("Request timed out: {message}")]
    Timeout { message: String },

    #[error("Request failed: {message}")]
    Request { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Response size {size} exceeds maximum {max}")]
    ResponseTooLarge { size: usize, max: usize },

    #[error("Failed to create HTTP client: {message}")]
    Build { message: String },
}

impl TransportError {
    /// HTTP status for [`TransportError::Status`]
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a 4xx other than 429
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status) && status != 429)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let message = error.to_string();
        if error.is_timeout() {
            TransportError::Timeout { message }
        } else if error.is_connect() {
            TransportError::Connect { message }
        } else if error.is_builder() {
            TransportError::InvalidRequest { message }
        } else if error.is_decode() || error.is_body() {
            TransportError::Decode { message }
        } else {
            TransportError::Request { message }
        }
    }
}

impl Retryable for TransportError {
    fn status_code(&self) -> Option<u16> {
        self.status()
    }

    fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Connect { .. } | TransportError::Timeout { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Map a non-2xx response to a [`TransportError::Status`]
pub fn map_http_error(url: &str, response: &HttpResponse) -> TransportError {
    let body = response.text();

    // Try to parse error details from response body
    let details = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| extract_error_details(&v));

    let message = match &details {
        Some(details) => details.message.clone(),
        None if !body.trim().is_empty() => body.clone(),
        None => format!("HTTP error {}", response.status),
    };

    let retry_after = response
        .header("retry-after")
        .and_then(parse_retry_after)
        .or_else(|| details.and_then(|d| d.retry_after));

    TransportError::Status {
        status: response.status,
        url: url.to_string(),
        message,
        retry_after,
        headers: response.headers.clone(),
        body,
    }
}

/// Error details extracted from response body
struct ErrorDetails {
    message: String,
    retry_after: Option<Duration>,
}

/// Extract error details from JSON response
fn extract_error_details(json: &Value) -> Option<ErrorDetails> {
    // OpenAI / Anthropic / Google: { "error": { "message": "...", ... } }
    if let Some(error) = json.get("error") {
        if let Some(message) = error.get("message").and_then(|v| v.as_str()) {
            return Some(ErrorDetails {
                message: message.to_string(),
                retry_after: error.get("retry_after").and_then(seconds_value),
            });
        }
    }

    // Generic format: { "message": "...", "error": "..." }
    if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
        return Some(ErrorDetails {
            message: message.to_string(),
            retry_after: json.get("retry_after").and_then(seconds_value),
        });
    }

    if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
        return Some(ErrorDetails {
            message: error.to_string(),
            retry_after: None,
        });
    }

    None
}

fn seconds_value(value: &Value) -> Option<Duration> {
    value.as_f64().and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Parse a `Retry-After` header value as (fractional) seconds.
///
/// Negative, non-finite and HTTP-date values yield `None` so the caller falls
/// back to its computed delay.
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let seconds: f64 = header_value.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
