//! JSON-over-HTTP plumbing shared by the vendor adapters

use super::adapter::ClientSettings;
use super::error::{ProviderError, ProviderResult};
use crate::http::{HttpClient, HttpRequest, HttpTransport};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// A vendor base URL plus the transport used to reach it
#[derive(Clone)]
pub(crate) struct Endpoint {
    provider: &'static str,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Endpoint {
    /// Resolve the base URL and transport for an adapter.
    ///
    /// Fails before any network call when the URL is malformed or the HTTP
    /// client cannot be created.
    pub(crate) fn new(
        provider: &'static str,
        settings: &ClientSettings,
        default_base_url: &str,
    ) -> ProviderResult<Self> {
        let base_url = settings
            .base_url
            .as_deref()
            .unwrap_or(default_base_url)
            .trim_end_matches('/')
            .to_string();

        let parsed = Url::parse(&base_url).map_err(|e| {
            ProviderError::configuration(provider, format!("invalid base URL '{base_url}': {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProviderError::configuration(
                provider,
                format!("unsupported URL scheme '{}'", parsed.scheme()),
            ));
        }

        let transport: Arc<dyn HttpTransport> = match &settings.transport {
            Some(transport) => transport.clone(),
            None => Arc::new(
                HttpClient::new()
                    .map_err(|e| ProviderError::configuration(provider, e.to_string()))?,
            ),
        };

        Ok(Self {
            provider,
            base_url,
            transport,
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST a JSON body once and decode the JSON reply
    pub(crate) async fn post_json(
        &self,
        path: &str,
        headers: Vec<(&'static str, String)>,
        body: Value,
    ) -> ProviderResult<Value> {
        let url = self.url(path);
        let mut request = HttpRequest::post(&url).json(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        debug!(
            "Sending {} request [request_id: {}]",
            self.provider,
            request.request_id()
        );

        let response = self
            .transport
            .send(request)
            .await
            .and_then(|response| response.error_for_status(&url))
            .map_err(|source| ProviderError::transport(self.provider, source))?;

        response
            .json::<Value>()
            .map_err(|e| ProviderError::unexpected(self.provider, e.to_string()))
    }
}
