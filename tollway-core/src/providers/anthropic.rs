//! Anthropic provider implementation
//!
//! Talks to the Messages API. System prompts travel in the top-level `system`
//! field rather than as a message, so any system entries in the history are
//! folded into it.

use super::adapter::{collect_system, resolve_model, ClientSettings, LlmClient, ModelTable};
use super::endpoint::Endpoint;
use super::error::{ProviderError, ProviderResult};
use super::registry::ProviderDescriptor;
use crate::protocol::{ChatMessage, MessageRole, NormalizedResponse, Usage};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const NAME: &str = "anthropic";

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

const API_VERSION: &str = "2023-06-01";

/// Friendly names -> API ids
pub const MODELS: ModelTable = &[
    // Expensive reasoning model
    ("claude-opus", "claude-opus-4-5-20250514"),
    ("claude-opus-4.5", "claude-opus-4-5-20250514"),
    // Default model
    ("claude-sonnet", "claude-sonnet-4-5-20250514"),
    ("claude-sonnet-4.5", "claude-sonnet-4-5-20250514"),
    // Inexpensive fast model
    ("claude-haiku", "claude-haiku-4-5-20251001"),
    ("claude-haiku-4.5", "claude-haiku-4-5-20251001"),
];

pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: NAME,
    api_key_env: Some("ANTHROPIC_API_KEY"),
    default_model: "claude-sonnet-4-5-20250514",
    models: MODELS,
    requires_credential: true,
    construct,
};

fn construct(settings: ClientSettings) -> ProviderResult<Box<dyn LlmClient>> {
    Ok(Box::new(AnthropicClient::new(settings)?))
}

/// Anthropic Claude client
#[derive(Debug)]
pub struct AnthropicClient {
    settings: ClientSettings,
    model_id: String,
    endpoint: Endpoint,
}

impl AnthropicClient {
    pub fn new(settings: ClientSettings) -> ProviderResult<Self> {
        let endpoint = Endpoint::new(NAME, &settings, DEFAULT_BASE_URL)?;
        let model_id = resolve_model(MODELS, &settings.model);
        Ok(Self {
            settings,
            model_id,
            endpoint,
        })
    }

    fn build_body(&self, messages: &[ChatMessage], system: Option<&str>) -> Value {
        let turns: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        let mut body = json!({
            "model": self.model_id,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "messages": turns,
        });
        if let Some(system) = collect_system(messages, system) {
            body["system"] = Value::String(system);
        }
        body
    }

    fn parse_response(&self, raw: Value) -> ProviderResult<NormalizedResponse> {
        let content = raw
            .get("content")
            .and_then(Value::as_array)
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            })
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::unexpected(NAME, "response has no text content block"))?
            .to_string();

        let usage = Usage::new(
            token_count(&raw, "input_tokens"),
            token_count(&raw, "output_tokens"),
        );
        let finish_reason = raw
            .get("stop_reason")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut response = NormalizedResponse::new(content, &self.model_id, NAME, usage)
            .with_finish_reason(finish_reason);
        if let Some(id) = raw.get("id").cloned() {
            response = response.with_metadata("id", id);
        }
        Ok(response.with_raw_response(raw))
    }
}

fn token_count(raw: &Value, field: &str) -> u64 {
    raw.pointer(&format!("/usage/{field}"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider_name(&self) -> &str {
        NAME
    }

    fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn chat_with_messages(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> ProviderResult<NormalizedResponse> {
        let headers = vec![
            ("x-api-key", self.settings.api_key.expose_secret().to_string()),
            ("anthropic-version", API_VERSION.to_string()),
        ];
        let raw = self
            .endpoint
            .post_json("messages", headers, self.build_body(messages, system))
            .await?;
        self.parse_response(raw)
    }
}
