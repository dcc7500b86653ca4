//! Scripted transport for tests
//!
//! [`MockTransport`] records every request and answers from, in order of
//! precedence: a one-shot error, a FIFO queue of scripted outcomes, a response
//! function, exact-URL responses, regex URL patterns, and a default response.

use super::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type ResponseFn = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Canned response builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    response: HttpResponse,
}

impl MockResponse {
    /// 200 with an empty body
    pub fn ok() -> Self {
        Self {
            response: HttpResponse::new(200),
        }
    }

    /// 200 with a JSON body
    pub fn ok_json(data: Value) -> Self {
        Self::json(200, data)
    }

    /// 200 with a text body
    pub fn ok_text(text: impl Into<String>) -> Self {
        Self {
            response: HttpResponse::new(200).with_body(text.into()),
        }
    }

    /// Any status with a JSON body
    pub fn json(status: u16, data: Value) -> Self {
        Self {
            response: HttpResponse::new(status)
                .with_header("content-type", "application/json")
                .with_body(data.to_string()),
        }
    }

    /// Error status with a plain-text message body
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            response: HttpResponse::new(status).with_body(message.into()),
        }
    }

    /// 429 with a `Retry-After` header
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            response: HttpResponse::new(429)
                .with_header("retry-after", retry_after_secs.to_string())
                .with_body("Rate limited"),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.response = self.response.with_header(name, value);
        self
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}

impl From<MockResponse> for HttpResponse {
    fn from(mock: MockResponse) -> Self {
        mock.response
    }
}

/// A request captured by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct MockState {
    default_response: HttpResponse,
    responses: HashMap<String, HttpResponse>,
    patterns: Vec<(Regex, HttpResponse)>,
    queue: VecDeque<Result<HttpResponse, TransportError>>,
    response_fn: Option<ResponseFn>,
    error: Option<TransportError>,
    requests: Vec<RecordedRequest>,
}

/// In-memory [`HttpTransport`]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MockTransport")
            .field("responses", &state.responses.len())
            .field("patterns", &state.patterns.len())
            .field("queued", &state.queue.len())
            .field("requests", &state.requests.len())
            .finish()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_default(MockResponse::ok())
    }

    /// Use `response` when nothing else matches
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            state: Mutex::new(MockState {
                default_response: response.into_response(),
                responses: HashMap::new(),
                patterns: Vec::new(),
                queue: VecDeque::new(),
                response_fn: None,
                error: None,
                requests: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Respond to an exact URL
    pub fn add_response(&self, url: impl Into<String>, response: MockResponse) {
        self.lock()
            .responses
            .insert(url.into(), response.into_response());
    }

    /// Respond to URLs whose beginning matches `pattern`
    pub fn add_response_pattern(
        &self,
        pattern: &str,
        response: MockResponse,
    ) -> Result<(), regex::Error> {
        let regex = Regex::new(pattern)?;
        self.lock().patterns.push((regex, response.into_response()));
        Ok(())
    }

    /// Queue a response for the next unanswered request
    pub fn push_response(&self, response: MockResponse) {
        self.lock().queue.push_back(Ok(response.into_response()));
    }

    /// Queue a transport failure for the next unanswered request
    pub fn push_error(&self, error: TransportError) {
        self.lock().queue.push_back(Err(error));
    }

    /// Generate responses dynamically
    pub fn set_response_fn<F>(&self, f: F)
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.lock().response_fn = Some(Arc::new(f));
    }

    /// Fail the next request only
    pub fn set_error(&self, error: TransportError) {
        self.lock().error = Some(error);
    }

    /// All requests seen so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Forget recorded requests
    pub fn reset(&self) {
        self.lock().requests.clear();
    }

    /// Panic unless `url` was requested (with `method`, when given)
    pub fn assert_called(&self, url: &str, method: Option<HttpMethod>) {
        let state = self.lock();
        let found = state
            .requests
            .iter()
            .any(|req| req.url == url && method.map_or(true, |m| req.method == m));
        assert!(found, "Expected call to {url} not found");
    }

    /// Panic if any request was made
    pub fn assert_not_called(&self) {
        let count = self.lock().requests.len();
        assert!(count == 0, "Expected no calls but got {count}");
    }

    fn respond(state: &mut MockState, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Some(error) = state.error.take() {
            return Err(error);
        }
        if let Some(outcome) = state.queue.pop_front() {
            return outcome;
        }
        if let Some(response_fn) = &state.response_fn {
            return Ok(response_fn(request));
        }
        if let Some(response) = state.responses.get(&request.url) {
            return Ok(response.clone());
        }
        let matched = state.patterns.iter().find(|(pattern, _)| {
            pattern
                .find(&request.url)
                .map_or(false, |m| m.start() == 0)
        });
        match matched {
            Some((_, response)) => Ok(response.clone()),
            None => Ok(state.default_response.clone()),
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method: request.method,
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        });
        Self::respond(&mut state, &request)
    }
}
