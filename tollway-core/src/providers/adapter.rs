//! Provider client trait and shared settings
//!
//! Every vendor adapter implements [`LlmClient`]: a constant provider name and
//! two chat operations that return a [`NormalizedResponse`].

use super::error::ProviderResult;
use crate::config::SecretString;
use crate::http::HttpTransport;
use crate::protocol::{ChatMessage, NormalizedResponse};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Default response token cap
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

/// Friendly model names mapped to vendor model ids
pub type ModelTable = &'static [(&'static str, &'static str)];

/// Resolve a friendly model name, passing unknown names through unchanged
pub fn resolve_model(table: ModelTable, name: &str) -> String {
    table
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, id)| (*id).to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Settings an adapter is constructed with
#[derive(Clone)]
pub struct ClientSettings {
    /// Requested model name (alias or literal vendor id)
    pub model: String,
    pub api_key: SecretString,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Endpoint override; the vendor default is used when unset
    pub base_url: Option<String>,
    /// Transport override; a pooled [`crate::http::HttpClient`] is used when unset
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl ClientSettings {
    pub fn new(model: impl Into<String>, api_key: impl Into<SecretString>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            base_url: None,
            transport: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("model", &self.model)
            .field("api_key", &self.api_key)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

/// Core trait that all LLM clients implement
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Constant provider identity, e.g. "anthropic"
    fn provider_name(&self) -> &str;

    /// Settings the client was built with
    fn settings(&self) -> &ClientSettings;

    /// Vendor model id sent on the wire
    fn model_id(&self) -> &str;

    /// Send a single user message
    async fn chat(&self, prompt: &str, system: Option<&str>) -> ProviderResult<NormalizedResponse> {
        let messages = [ChatMessage::user(prompt)];
        self.chat_with_messages(&messages, system).await
    }

    /// Send a conversation history
    async fn chat_with_messages(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> ProviderResult<NormalizedResponse>;
}

impl fmt::Debug for dyn LlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider_name())
            .field("model", &self.model_id())
            .finish()
    }
}

/// Merge the explicit system prompt with any system messages in the list
pub(crate) fn collect_system(messages: &[ChatMessage], system: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = system
        .into_iter()
        .chain(
            messages
                .iter()
                .filter(|m| m.role == crate::protocol::MessageRole::System)
                .map(|m| m.content.as_str()),
        )
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}
