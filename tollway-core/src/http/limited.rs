//! Rate-limited HTTP client (single attempt)

use super::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpTransport, RateLimitConfig,
    RateLimiter, TransportError,
};
use crate::config::ConfigError;
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP client that takes a limiter token before every request.
///
/// Non-2xx responses are returned as [`TransportError::Status`]. No retries
/// happen here; wrap it in a [`super::RetryingClient`] for that.
#[derive(Clone)]
pub struct RateLimitedClient {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    default_headers: Vec<(String, String)>,
}

impl std::fmt::Debug for RateLimitedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedClient")
            .field("limiter", &self.limiter)
            .field("default_headers", &self.default_headers.len())
            .finish()
    }
}

impl RateLimitedClient {
    /// Wrap an existing transport and limiter.
    ///
    /// Clients built from the same `Arc<RateLimiter>` share one budget.
    pub fn new(transport: Arc<dyn HttpTransport>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            transport,
            limiter,
            default_headers: Vec::new(),
        }
    }

    /// Build a reqwest-backed client with its own limiter
    pub fn from_config(config: RateLimitConfig) -> Result<Self, ConfigError> {
        let limiter = RateLimiter::new(config)?;
        let transport = HttpClient::new()?;
        Ok(Self::new(Arc::new(transport), Arc::new(limiter)))
    }

    /// Add a header sent with every request
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Acquire a token, send the request once, and fail on non-2xx
    pub async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.limiter.acquire().await;

        for (name, value) in &self.default_headers {
            if request.header_value(name).is_none() {
                request.headers.push((name.clone(), value.clone()));
            }
        }

        let url = request.url.clone();
        let request_id = request.request_id();
        let response = self.transport.send(request).await?;

        if response.is_success() {
            debug!(
                "{} responded {} [request_id: {}]",
                url, response.status, request_id
            );
            Ok(response)
        } else {
            warn!(
                "Request to {} failed with status {} [request_id: {}]",
                url, response.status, request_id
            );
            response.error_for_status(&url)
        }
    }

    /// Send a bodiless request with the given method
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
    ) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::new(method, url)).await
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.request(HttpMethod::Get, url).await
    }

    pub async fn delete(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.request(HttpMethod::Delete, url).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::new(HttpMethod::Post, url).json(body)).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::new(HttpMethod::Put, url).json(body)).await
    }

    pub async fn patch(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::new(HttpMethod::Patch, url).json(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockResponse, MockTransport};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    fn client(mock: &Arc<MockTransport>, rate: f64) -> RateLimitedClient {
        let limiter = RateLimiter::new(RateLimitConfig::new(rate).with_burst(1)).unwrap();
        RateLimitedClient::new(mock.clone(), Arc::new(limiter))
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_call_takes_a_token() {
        let mock = Arc::new(MockTransport::new());
        let client = client(&mock, 10.0);
        let start = Instant::now();

        client.get("https://api.example.com/a").await.unwrap();
        client
            .post("https://api.example.com/b", json!({"x": 1}))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(100));
        mock.assert_called("https://api.example.com/a", Some(HttpMethod::Get));
        mock.assert_called("https://api.example.com/b", Some(HttpMethod::Post));
    }

    #[tokio::test]
    async fn test_non_success_becomes_status_error() {
        let mock = Arc::new(MockTransport::new());
        mock.add_response("https://api.example.com/missing", MockResponse::error(404, "nope"));
        let client = client(&mock, 100.0);

        let err = client
            .get("https://api.example.com/missing")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_default_headers_do_not_override_request_headers() {
        let mock = Arc::new(MockTransport::new());
        let client = client(&mock, 100.0)
            .with_default_header("x-team", "infra")
            .with_default_header("accept", "application/json");

        client
            .send(HttpRequest::get("https://api.example.com/h").header("Accept", "text/plain"))
            .await
            .unwrap();

        let recorded = &mock.requests()[0];
        assert_eq!(recorded.header("x-team"), Some("infra"));
        assert_eq!(recorded.header("accept"), Some("text/plain"));
    }
}
