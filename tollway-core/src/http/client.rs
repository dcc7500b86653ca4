//! HTTP client implementation using reqwest

use super::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("tollway/", env!("CARGO_PKG_VERSION"));

/// Default whole-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// Headers added to every request
    default_headers: Vec<(String, String)>,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("default_headers", &self.default_headers.len())
            .field("max_response_size", &self.max_response_size)
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(Duration::from_secs(10), DEFAULT_TIMEOUT, 10)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(
        connect_timeout: Duration,
        request_timeout: Duration,
        max_idle_per_host: usize,
    ) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Build {
                message: e.to_string(),
            })?;

        Ok(Self {
            client: Arc::new(client),
            default_headers: Vec::new(),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Add a header sent with every request
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Override the response size limit
    pub fn with_max_response_size(mut self, max: usize) -> Self {
        self.max_response_size = max;
        self
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let request_id = request.request_id();
        debug!("{} {} [request_id: {}]", request.method, request.url, request_id);

        let mut req_builder = self
            .client
            .request(Self::method(request.method), &request.url);

        if let Some(timeout) = request.options.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        for (key, value) in self.default_headers.iter().chain(request.headers.iter()) {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        // Add request ID header for correlation
        req_builder = req_builder.header("X-Request-ID", request_id.to_string());

        if let Some(ref idempotency_key) = request.options.idempotency_key {
            req_builder = req_builder.header("Idempotency-Key", idempotency_key);
        }

        if let Some(ref body) = request.body {
            req_builder = req_builder.json(body);
        }

        let response = req_builder.send().await.map_err(|e| {
            let mapped = TransportError::from(e);
            match &mapped {
                TransportError::Timeout { .. } => {
                    warn!("Request timeout for {} [request_id: {}]", request.url, request_id)
                }
                _ => error!(
                    "Request error for {} [request_id: {}]: {}",
                    request.url, request_id, mapped
                ),
            }
            mapped
        })?;

        let status = response.status().as_u16();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(TransportError::ResponseTooLarge {
                    size: content_length as usize,
                    max: self.max_response_size,
                });
            }
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.bytes().await?;

        // Check response size after reading
        if body.len() > self.max_response_size {
            return Err(TransportError::ResponseTooLarge {
                size: body.len(),
                max: self.max_response_size,
            });
        }

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
