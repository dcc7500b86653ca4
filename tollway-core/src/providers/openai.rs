//! OpenAI provider implementation
//!
//! The chat-completions request/response handling here is shared with every
//! OpenAI-compatible vendor (see [`super::grok`]).

use super::adapter::{resolve_model, ClientSettings, LlmClient, ModelTable};
use super::endpoint::Endpoint;
use super::error::{ProviderError, ProviderResult};
use super::registry::ProviderDescriptor;
use crate::protocol::{ChatMessage, NormalizedResponse, Usage};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const NAME: &str = "openai";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const MODELS: ModelTable = &[
    // GPT-4.1 series
    ("gpt-4.1", "gpt-4.1"),
    ("gpt-4.1-mini", "gpt-4.1-mini"),
    ("gpt-4.1-nano", "gpt-4.1-nano"),
    // Reasoning models
    ("o3", "o3"),
    ("o3-mini", "o3-mini"),
    ("o3-pro", "o3-pro"),
    ("o4-mini", "o4-mini"),
    ("o1", "o1"),
    ("o1-pro", "o1-pro"),
    // GPT-4o series
    ("gpt-4o", "gpt-4o"),
    ("gpt-4o-mini", "gpt-4o-mini"),
    // Legacy
    ("gpt-4-turbo", "gpt-4-turbo"),
    ("gpt-4", "gpt-4"),
];

pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: NAME,
    api_key_env: Some("OPENAI_API_KEY"),
    default_model: "gpt-4o",
    models: MODELS,
    requires_credential: true,
    construct,
};

fn construct(settings: ClientSettings) -> ProviderResult<Box<dyn LlmClient>> {
    Ok(Box::new(OpenAiClient::new(settings)?))
}

/// A chat-completions endpoint speaking for one provider name
#[derive(Debug)]
pub(crate) struct ChatCompletions {
    provider: &'static str,
    settings: ClientSettings,
    model_id: String,
    endpoint: Endpoint,
}

impl ChatCompletions {
    pub(crate) fn new(
        provider: &'static str,
        settings: ClientSettings,
        models: ModelTable,
        default_base_url: &str,
    ) -> ProviderResult<Self> {
        let endpoint = Endpoint::new(provider, &settings, default_base_url)?;
        let model_id = resolve_model(models, &settings.model);
        Ok(Self {
            provider,
            settings,
            model_id,
            endpoint,
        })
    }

    pub(crate) fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub(crate) fn model_id(&self) -> &str {
        &self.model_id
    }

    /// The system prompt goes first, followed by the history as given
    fn build_body(&self, messages: &[ChatMessage], system: Option<&str>) -> Value {
        let mut formatted = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system.filter(|s| !s.is_empty()) {
            formatted.push(json!({"role": "system", "content": system}));
        }
        formatted.extend(
            messages
                .iter()
                .map(|m| json!({"role": m.role.as_str(), "content": m.content})),
        );

        json!({
            "model": self.model_id,
            "messages": formatted,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        })
    }

    fn parse_response(&self, raw: Value) -> ProviderResult<NormalizedResponse> {
        let choice = raw
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .ok_or_else(|| ProviderError::unexpected(self.provider, "response has no choices"))?;

        // Refusals and tool calls can come back with null content
        let content = choice
            .pointer("/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let finish_reason = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(str::to_string);

        // Usage may be missing on some compatible servers
        let usage = Usage::new(
            token_count(&raw, "prompt_tokens"),
            token_count(&raw, "completion_tokens"),
        );

        let mut response = NormalizedResponse::new(content, &self.model_id, self.provider, usage)
            .with_finish_reason(finish_reason);
        if let Some(id) = raw.get("id").cloned() {
            response = response.with_metadata("id", id);
        }
        if let Some(model) = raw.get("model").cloned() {
            response = response.with_metadata("served_model", model);
        }
        Ok(response.with_raw_response(raw))
    }

    pub(crate) async fn send(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> ProviderResult<NormalizedResponse> {
        let headers = vec![(
            "Authorization",
            format!("Bearer {}", self.settings.api_key.expose_secret()),
        )];
        let raw = self
            .endpoint
            .post_json("chat/completions", headers, self.build_body(messages, system))
            .await?;
        self.parse_response(raw)
    }
}

fn token_count(raw: &Value, field: &str) -> u64 {
    raw.get("usage")
        .and_then(|usage| usage.get(field))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// OpenAI GPT client
#[derive(Debug)]
pub struct OpenAiClient {
    inner: ChatCompletions,
}

impl OpenAiClient {
    pub fn new(settings: ClientSettings) -> ProviderResult<Self> {
        Ok(Self {
            inner: ChatCompletions::new(NAME, settings, MODELS, DEFAULT_BASE_URL)?,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        NAME
    }

    fn settings(&self) -> &ClientSettings {
        self.inner.settings()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn chat_with_messages(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> ProviderResult<NormalizedResponse> {
        self.inner.send(messages, system).await
    }
}
