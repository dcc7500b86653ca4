//! Retrying HTTP client

use super::{HttpMethod, HttpRequest, HttpResponse, RateLimitedClient, TransportError};
use crate::retry::{is_retryable, RetryError, RetryExecutor, RetryPolicy};
use std::time::Duration;
use tracing::warn;

/// Rate-limited client with exponential backoff.
///
/// Client errors (4xx) other than 429 are never retried. A `Retry-After`
/// header on a failed response replaces the computed delay for that attempt.
#[derive(Debug, Clone)]
pub struct RetryingClient {
    inner: RateLimitedClient,
    executor: RetryExecutor,
}

impl RetryingClient {
    pub fn new(inner: RateLimitedClient, policy: RetryPolicy) -> Self {
        let executor = RetryExecutor::new(policy).with_observer(log_retry);
        Self { inner, executor }
    }

    /// Use a custom executor (for example one with its own observer)
    pub fn with_executor(inner: RateLimitedClient, executor: RetryExecutor) -> Self {
        Self { inner, executor }
    }

    pub fn inner(&self) -> &RateLimitedClient {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    /// Send `request`, retrying transient failures.
    ///
    /// Every attempt reuses the request id so retries correlate in logs.
    pub async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, RetryError<TransportError>> {
        self.executor
            .execute_with(|| self.inner.send(request.clone()), should_retry)
            .await
    }

    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
    ) -> Result<HttpResponse, RetryError<TransportError>> {
        self.send(HttpRequest::new(method, url)).await
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, RetryError<TransportError>> {
        self.request(HttpMethod::Get, url).await
    }

    pub async fn delete(&self, url: &str) -> Result<HttpResponse, RetryError<TransportError>> {
        self.request(HttpMethod::Delete, url).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, RetryError<TransportError>> {
        self.send(HttpRequest::post(url).json(body)).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, RetryError<TransportError>> {
        self.send(HttpRequest::new(HttpMethod::Put, url).json(body)).await
    }

    pub async fn patch(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, RetryError<TransportError>> {
        self.send(HttpRequest::new(HttpMethod::Patch, url).json(body))
            .await
    }
}

/// 4xx other than 429 is terminal regardless of what the classifier says
fn should_retry(error: &TransportError) -> bool {
    !error.is_client_error() && is_retryable(error)
}

fn log_retry(attempt: u32, error: &dyn std::error::Error, delay: Duration) {
    warn!(
        "Request failed, retry {} after {:.1}s: {}",
        attempt,
        delay.as_secs_f64(),
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockResponse, MockTransport, RateLimitConfig, RateLimiter};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn client(mock: &Arc<MockTransport>, max_retries: u32) -> RetryingClient {
        let limiter = RateLimiter::new(RateLimitConfig::new(1000.0)).unwrap();
        let limited = RateLimitedClient::new(mock.clone(), Arc::new(limiter));
        RetryingClient::new(
            limited,
            RetryPolicy::new(max_retries)
                .with_delays(Duration::from_secs(1), Duration::from_secs(30)),
        )
    }

    #[test]
    fn test_should_retry_overrides() {
        let status = |code| TransportError::Status {
            status: code,
            url: "u".into(),
            message: "too many requests".into(),
            retry_after: None,
            headers: Default::default(),
            body: String::new(),
        };
        assert!(should_retry(&status(429)));
        assert!(should_retry(&status(503)));
        assert!(!should_retry(&status(403)));
        assert!(!should_retry(&status(418)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_is_not_retried() {
        let mock = Arc::new(MockTransport::with_default(MockResponse::error(403, "denied")));
        let err = client(&mock, 3).get("https://api.test/x").await.unwrap_err();

        assert!(!err.is_exhausted());
        assert_eq!(err.inner().status(), Some(403));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_uses_retry_after() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(MockResponse::rate_limited(2));
        mock.push_response(MockResponse::ok_text("done"));
        let start = Instant::now();

        let response = client(&mock, 3).get("https://api.test/x").await.unwrap();

        assert_eq!(response.text(), "done");
        assert_eq!(mock.request_count(), 2);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_wraps_last_error() {
        let mock = Arc::new(MockTransport::with_default(MockResponse::error(502, "bad gateway")));
        let err = client(&mock, 2).get("https://api.test/x").await.unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(err.inner().status(), Some(502));
        assert_eq!(mock.request_count(), 3);
    }
}
