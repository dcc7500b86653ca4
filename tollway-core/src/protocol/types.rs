//! Core protocol types for LLM interactions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Standardized response from any provider.
///
/// Built once per call and read-only afterwards. The vendor payload kept in
/// `raw_response` is for debugging and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResponse {
    content: String,
    model: String,
    provider: String,
    #[serde(default)]
    usage: Usage,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
    #[serde(skip)]
    raw_response: Option<serde_json::Value>,
}

impl NormalizedResponse {
    pub fn new(
        content: impl Into<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
        usage: Usage,
    ) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            provider: provider.into(),
            usage,
            finish_reason: None,
            metadata: HashMap::new(),
            raw_response: None,
        }
    }

    pub fn with_finish_reason(mut self, reason: Option<String>) -> Self {
        self.finish_reason = reason;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_raw_response(mut self, raw: serde_json::Value) -> Self {
        self.raw_response = Some(raw);
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Model id that served the request
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn input_tokens(&self) -> u64 {
        self.usage.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.usage.output_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.usage.total()
    }

    /// Why generation stopped (e.g. "stop", "max_tokens")
    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn raw_response(&self) -> Option<&serde_json::Value> {
        self.raw_response.as_ref()
    }

    /// Consume the response, keeping only the text
    pub fn into_content(self) -> String {
        self.content
    }
}

impl fmt::Display for NormalizedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_empty_usage_totals_zero() {
        let response = NormalizedResponse::new("hi", "m", "p", Usage::default());
        assert_eq!(response.total_tokens(), 0);
        assert_eq!(response.finish_reason(), None);
    }

    #[test]
    fn test_raw_response_is_not_serialized() {
        let response = NormalizedResponse::new("hi", "gpt-4o", "openai", Usage::new(3, 4))
            .with_finish_reason(Some("stop".into()))
            .with_metadata("id", json!("chatcmpl-1"))
            .with_raw_response(json!({"secret": "vendor"}));

        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("raw_response").is_none());
        assert_eq!(value["usage"], json!({"input_tokens": 3, "output_tokens": 4}));
        assert_eq!(value["finish_reason"], json!("stop"));
        assert_eq!(value["metadata"]["id"], json!("chatcmpl-1"));

        let back: NormalizedResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back.raw_response(), None);
        assert_eq!(back.total_tokens(), 7);
    }

    #[test]
    fn test_total_tokens_saturates() {
        assert_eq!(Usage::new(u64::MAX, 1).total(), u64::MAX);
        let response = NormalizedResponse::new("", "m", "p", Usage::new(1, u64::MAX));
        assert_eq!(response.total_tokens(), u64::MAX);
    }

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let value = serde_json::to_value(ChatMessage::assistant("ok")).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "ok"}));
    }

    proptest! {
        #[test]
        fn total_tokens_is_sum(input in 0u64..1_000_000_000, output in 0u64..1_000_000_000) {
            let response = NormalizedResponse::new("", "m", "p", Usage::new(input, output));
            prop_assert_eq!(response.total_tokens(), input + output);
        }
    }
}
