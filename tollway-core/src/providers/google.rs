//! Google Gemini provider implementation
//!
//! Uses the `generateContent` REST endpoint. Gemini names the assistant role
//! "model" and carries the system prompt in `systemInstruction`.

use super::adapter::{collect_system, resolve_model, ClientSettings, LlmClient, ModelTable};
use super::endpoint::Endpoint;
use super::error::{ProviderError, ProviderResult};
use super::registry::ProviderDescriptor;
use crate::protocol::{ChatMessage, MessageRole, NormalizedResponse, Usage};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const NAME: &str = "google";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// Gemini 1.5 and 1.0 are retired (return 404)
pub const MODELS: ModelTable = &[
    // Gemini 2.5 series
    ("gemini-2.5-pro", "gemini-2.5-pro"),
    ("gemini-2.5-flash", "gemini-2.5-flash"),
    ("gemini-2.5-flash-lite", "gemini-2.5-flash-lite"),
    // Gemini 2.0 series
    ("gemini-2.0-flash", "gemini-2.0-flash"),
    ("gemini-2.0-flash-thinking", "gemini-2.0-flash-thinking-exp"),
    // TTS models
    ("gemini-2.5-flash-tts", "gemini-2.5-flash-tts-preview"),
    ("gemini-2.5-pro-tts", "gemini-2.5-pro-tts-preview"),
];

pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: NAME,
    api_key_env: Some("GOOGLE_API_KEY"),
    default_model: "gemini-2.0-flash",
    models: MODELS,
    requires_credential: true,
    construct,
};

fn construct(settings: ClientSettings) -> ProviderResult<Box<dyn LlmClient>> {
    Ok(Box::new(GoogleClient::new(settings)?))
}

/// Google Gemini client
#[derive(Debug)]
pub struct GoogleClient {
    settings: ClientSettings,
    model_id: String,
    endpoint: Endpoint,
}

impl GoogleClient {
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
        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| {
                let role = match m.role {
                    MessageRole::User => "user",
                    _ => "model",
                };
                json!({"role": role, "parts": [{"text": m.content}]})
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_tokens,
            },
        });
        if let Some(system) = collect_system(messages, system) {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        body
    }

    fn parse_response(&self, raw: Value) -> ProviderResult<NormalizedResponse> {
        let candidate = match raw
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
        {
            Some(candidate) => candidate,
            None => {
                let reason = raw
                    .pointer("/promptFeedback/blockReason")
                    .and_then(Value::as_str)
                    .unwrap_or("no candidates returned");
                return Err(ProviderError::unexpected(NAME, reason));
            }
        };

        let content: String = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        let finish_reason = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .map(str::to_string);

        let usage = Usage::new(
            token_count(&raw, "promptTokenCount"),
            token_count(&raw, "candidatesTokenCount"),
        );

        let mut response = NormalizedResponse::new(content, &self.model_id, NAME, usage)
            .with_finish_reason(finish_reason);
        if let Some(version) = raw.get("modelVersion").cloned() {
            response = response.with_metadata("model_version", version);
        }
        Ok(response.with_raw_response(raw))
    }
}

fn token_count(raw: &Value, field: &str) -> u64 {
    raw.get("usageMetadata")
        .and_then(|usage| usage.get(field))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

#[async_trait]
impl LlmClient for GoogleClient {
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
        let headers = vec![(
            "x-goog-api-key",
            self.settings.api_key.expose_secret().to_string(),
        )];
        let path = format!("models/{}:generateContent", self.model_id);
        let raw = self
            .endpoint
            .post_json(&path, headers, self.build_body(messages, system))
            .await?;
        self.parse_response(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockResponse, MockTransport};
    use std::sync::Arc;

    fn client(mock: &Arc<MockTransport>, model: &str) -> GoogleClient {
        GoogleClient::new(ClientSettings::new(model, "goog-test").with_transport(mock.clone()))
            .unwrap()
    }

    #[test]
    fn test_body_shape() {
        let mock = Arc::new(MockTransport::new());
        let body = client(&mock, "gemini-2.0-flash").build_body(
            &[ChatMessage::user("Hi"), ChatMessage::assistant("Hello")],
            Some("Be kind."),
        );

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "Hello");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be kind.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(MockResponse::ok_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hel"}, {"text": "lo"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2}
        })));

        let response = client(&mock, "gemini-2.0-flash-thinking")
            .chat("Hi", None)
            .await
            .unwrap();

        assert_eq!(response.content(), "Hello");
        assert_eq!(response.model(), "gemini-2.0-flash-thinking-exp");
        assert_eq!(response.total_tokens(), 6);
        assert_eq!(response.finish_reason(), Some("STOP"));

        let request = &mock.requests()[0];
        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-thinking-exp:generateContent"
        );
        assert_eq!(request.header("x-goog-api-key"), Some("goog-test"));
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(MockResponse::ok_json(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })));

        let err = client(&mock, "gemini-2.5-pro").chat("Hi", None).await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
