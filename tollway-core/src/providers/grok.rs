//! xAI Grok provider implementation
//!
//! Grok exposes an OpenAI-compatible chat-completions API, so requests go
//! through the same handling as [`super::openai`] with a different base URL.

use super::adapter::{ClientSettings, LlmClient, ModelTable};
use super::error::ProviderResult;
use super::openai::ChatCompletions;
use super::registry::ProviderDescriptor;
use crate::protocol::{ChatMessage, NormalizedResponse};
use async_trait::async_trait;

pub const NAME: &str = "grok";

pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";

pub const MODELS: ModelTable = &[
    ("grok", "grok-4-1-fast-reasoning"),
    ("grok-4", "grok-4-1-fast-reasoning"),
    ("grok-reasoning", "grok-4-1-fast-reasoning"),
    ("grok-fast", "grok-4-1-fast-non-reasoning"),
    ("grok-4-fast", "grok-4-1-fast-non-reasoning"),
];

pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: NAME,
    api_key_env: Some("XAI_API_KEY"),
    default_model: "grok-3",
    models: MODELS,
    requires_credential: true,
    construct,
};

fn construct(settings: ClientSettings) -> ProviderResult<Box<dyn LlmClient>> {
    Ok(Box::new(GrokClient::new(settings)?))
}

/// xAI Grok client
#[derive(Debug)]
pub struct GrokClient {
    inner: ChatCompletions,
}

impl GrokClient {
    pub fn new(settings: ClientSettings) -> ProviderResult<Self> {
        Ok(Self {
            inner: ChatCompletions::new(NAME, settings, MODELS, DEFAULT_BASE_URL)?,
        })
    }
}

#[async_trait]
impl LlmClient for GrokClient {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockResponse, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_uses_xai_endpoint_and_reports_grok() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(MockResponse::ok_json(json!({
            "choices": [{"message": {"content": "pong"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 2, "completion_tokens": 1}
        })));
        let client =
            GrokClient::new(ClientSettings::new("grok-fast", "xai-test").with_transport(mock.clone()))
                .unwrap();

        assert_eq!(client.model_id(), "grok-4-1-fast-non-reasoning");
        let response = client.chat("ping", None).await.unwrap();

        assert_eq!(response.provider(), "grok");
        assert_eq!(response.content(), "pong");
        mock.assert_called("https://api.x.ai/v1/chat/completions", None);
    }

    #[test]
    fn test_default_model_is_not_aliased() {
        let mock = Arc::new(MockTransport::new());
        let client = GrokClient::new(
            ClientSettings::new(DESCRIPTOR.default_model, "k").with_transport(mock),
        )
        .unwrap();
        assert_eq!(client.model_id(), "grok-3");
    }
}
