//! Mock LLM client for tests
//!
//! [`MockLlmClient`] answers without any network I/O and records every call.
//! It is not part of the built-in registry; register [`DESCRIPTOR`] to make
//! the factory hand out mock clients.

use super::adapter::{ClientSettings, LlmClient};
use super::error::{ProviderError, ProviderResult};
use super::registry::ProviderDescriptor;
use crate::protocol::{ChatMessage, NormalizedResponse, Usage};
use crate::retry::TaggedError;
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const NAME: &str = "mock";

pub const DEFAULT_MODEL: &str = "mock-model";

pub const DEFAULT_RESPONSE: &str = "Mock response";

pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: NAME,
    api_key_env: None,
    default_model: DEFAULT_MODEL,
    models: &[],
    requires_credential: false,
    construct,
};

fn construct(settings: ClientSettings) -> ProviderResult<Box<dyn LlmClient>> {
    Ok(Box::new(MockLlmClient::with_settings(settings)))
}

/// Builds a reply from `(prompt, system)`
pub type ResponseFn = Arc<dyn Fn(&str, Option<&str>) -> String + Send + Sync>;

#[derive(Clone)]
enum Responder {
    Static(String),
    Cycle(Vec<String>),
    Function(ResponseFn),
}

/// When the configured error is raised
#[derive(Debug, Clone, Copy)]
enum ErrorWindow {
    /// On every call after the first `n`
    After(usize),
    /// On the first `n` calls only
    First(usize),
}

/// A call captured by [`MockLlmClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Set for `chat`, `None` for `chat_with_messages`
    pub prompt: Option<String>,
    pub system: Option<String>,
    /// Set for `chat_with_messages`
    pub messages: Option<Vec<ChatMessage>>,
}

#[derive(Debug, Default)]
struct CallState {
    call_count: usize,
    response_index: usize,
    calls: Vec<RecordedCall>,
}

/// Canned-response [`LlmClient`]
pub struct MockLlmClient {
    settings: ClientSettings,
    responder: Responder,
    usage: Usage,
    error: Option<(ProviderError, ErrorWindow)>,
    state: Mutex<CallState>,
}

impl fmt::Debug for MockLlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockLlmClient")
            .field("model", &self.settings.model)
            .field("usage", &self.usage)
            .field("error", &self.error)
            .field("calls", &self.call_count())
            .finish()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    /// A client that always answers "Mock response"
    pub fn new() -> Self {
        Self::with_settings(ClientSettings::new(DEFAULT_MODEL, "mock-key"))
    }

    fn with_settings(settings: ClientSettings) -> Self {
        Self {
            settings,
            responder: Responder::Static(DEFAULT_RESPONSE.to_string()),
            usage: Usage::new(10, 20),
            error: None,
            state: Mutex::new(CallState::default()),
        }
    }

    /// Always answer `response`
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.responder = Responder::Static(response.into());
        self
    }

    /// Cycle through `responses`; an empty list falls back to the default reply
    pub fn with_responses<I, S>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let responses: Vec<String> = responses.into_iter().map(Into::into).collect();
        self.responder = if responses.is_empty() {
            Responder::Static(DEFAULT_RESPONSE.to_string())
        } else {
            Responder::Cycle(responses)
        };
        self
    }

    /// Compute each reply from the prompt and system prompt
    pub fn with_response_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Option<&str>) -> String + Send + Sync + 'static,
    {
        self.responder = Responder::Function(Arc::new(f));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.settings.model = model.into();
        self
    }

    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.usage = Usage::new(input_tokens, output_tokens);
        self
    }

    /// Fail every call after the first `error_after` calls
    pub fn with_error(mut self, error: ProviderError, error_after: usize) -> Self {
        self.error = Some((error, ErrorWindow::After(error_after)));
        self
    }

    /// Fail the first `count` calls, then answer normally
    pub fn with_failures(mut self, error: ProviderError, count: usize) -> Self {
        self.error = Some((error, ErrorWindow::First(count)));
        self
    }

    fn lock(&self) -> MutexGuard<'_, CallState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn call_count(&self) -> usize {
        self.lock().call_count
    }

    /// Recorded calls in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Clear call history and restart the response cycle
    pub fn reset(&self) {
        *self.lock() = CallState::default();
    }

    /// Panic unless `chat` was called with `prompt` (and `system`, when given)
    pub fn assert_called_with(&self, prompt: &str, system: Option<&str>) {
        let calls = self.calls();
        let found = calls.iter().any(|call| {
            call.prompt.as_deref() == Some(prompt)
                && system.map_or(true, |s| call.system.as_deref() == Some(s))
        });
        assert!(
            found,
            "Expected call with prompt='{prompt}', system='{system:?}' not found. Calls: {calls:?}"
        );
    }

    /// Panic if any call was made
    pub fn assert_not_called(&self) {
        let count = self.lock().calls.len();
        assert!(count == 0, "Expected no calls but got {count}");
    }

    fn respond(&self, call: RecordedCall, prompt: &str) -> ProviderResult<NormalizedResponse> {
        let system = call.system.clone();
        let content = {
            let mut state = self.lock();
            state.call_count += 1;
            state.calls.push(call);

            if let Some((error, window)) = &self.error {
                let fail = match *window {
                    ErrorWindow::After(n) => state.call_count > n,
                    ErrorWindow::First(n) => state.call_count <= n,
                };
                if fail {
                    return Err(error.clone());
                }
            }

            match &self.responder {
                Responder::Static(text) => text.clone(),
                Responder::Cycle(responses) => {
                    let text = responses[state.response_index % responses.len()].clone();
                    state.response_index += 1;
                    text
                }
                Responder::Function(f) => {
                    drop(state);
                    f(prompt, system.as_deref())
                }
            }
        };

        Ok(
            NormalizedResponse::new(content, &self.settings.model, NAME, self.usage)
                .with_finish_reason(Some("stop".to_string())),
        )
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        NAME
    }

    fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn model_id(&self) -> &str {
        &self.settings.model
    }

    async fn chat(&self, prompt: &str, system: Option<&str>) -> ProviderResult<NormalizedResponse> {
        let call = RecordedCall {
            prompt: Some(prompt.to_string()),
            system: system.map(str::to_string),
            messages: None,
        };
        self.respond(call, prompt)
    }

    /// The last message stands in for the prompt
    async fn chat_with_messages(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> ProviderResult<NormalizedResponse> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let call = RecordedCall {
            prompt: None,
            system: system.map(str::to_string),
            messages: Some(messages.to_vec()),
        };
        self.respond(call, &last)
    }
}

/// Preset mock clients
#[derive(Debug, Clone, Copy, Default)]
pub struct MockLlmClientFactory;

impl MockLlmClientFactory {
    /// A client answering `response`
    pub fn create(&self, response: impl Into<String>) -> MockLlmClient {
        MockLlmClient::new().with_response(response)
    }

    /// Fails the first `fail_first` calls with a retryable "Rate limited" error
    pub fn create_rate_limited(&self, fail_first: usize) -> MockLlmClient {
        MockLlmClient::new()
            .with_response("Success")
            .with_failures(TaggedError::retryable("Rate limited").into(), fail_first)
    }

    /// Answers with `data` serialized as JSON
    pub fn create_json_responder(&self, data: &serde_json::Value) -> MockLlmClient {
        MockLlmClient::new().with_response(data.to_string())
    }

    /// Answers "Echo: <prompt>"
    pub fn create_echo(&self) -> MockLlmClient {
        MockLlmClient::new().with_response_fn(|prompt, _| format!("Echo: {prompt}"))
    }
}
