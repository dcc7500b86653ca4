//! Backoff decorator for any [`LlmClient`]

use super::adapter::{ClientSettings, LlmClient};
use super::error::{ProviderError, ProviderResult};
use crate::protocol::{ChatMessage, NormalizedResponse};
use crate::retry::{RetryError, RetryExecutor, RetryPolicy};
use async_trait::async_trait;
use std::sync::Arc;

/// Runs every chat call of the wrapped client under a [`RetryExecutor`].
///
/// Exhausted retries surface as [`ProviderError::RetriesExhausted`] holding the
/// last failure; permanent failures are returned unchanged.
pub struct RetryingLlmClient<C: ?Sized> {
    inner: Arc<C>,
    executor: RetryExecutor,
}

impl<C: ?Sized> std::fmt::Debug for RetryingLlmClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingLlmClient")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl<C: LlmClient + ?Sized> RetryingLlmClient<C> {
    pub fn new(inner: Arc<C>, policy: RetryPolicy) -> Self {
        Self::with_executor(inner, RetryExecutor::new(policy))
    }

    pub fn with_executor(inner: Arc<C>, executor: RetryExecutor) -> Self {
        Self { inner, executor }
    }

    pub fn inner(&self) -> &Arc<C> {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }
}

impl RetryingLlmClient<dyn LlmClient> {
    /// Wrap a client handed out by the factory
    pub fn from_boxed(inner: Box<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self::new(Arc::from(inner), policy)
    }
}

fn flatten(error: RetryError<ProviderError>) -> ProviderError {
    match error {
        RetryError::Aborted(error) => error,
        RetryError::Exhausted {
            max_retries,
            source,
        } => ProviderError::RetriesExhausted {
            max_retries,
            source: Box::new(source),
        },
    }
}

#[async_trait]
impl<C: LlmClient + ?Sized> LlmClient for RetryingLlmClient<C> {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn settings(&self) -> &ClientSettings {
        self.inner.settings()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn chat(&self, prompt: &str, system: Option<&str>) -> ProviderResult<NormalizedResponse> {
        self.executor
            .execute(|| self.inner.chat(prompt, system))
            .await
            .map_err(flatten)
    }

    async fn chat_with_messages(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> ProviderResult<NormalizedResponse> {
        self.executor
            .execute(|| self.inner.chat_with_messages(messages, system))
            .await
            .map_err(flatten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockLlmClient, MockLlmClientFactory};
    use std::time::Duration;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_delays(Duration::from_secs(1), Duration::from_secs(30))
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let mock = Arc::new(MockLlmClientFactory.create_rate_limited(2));
        let client = RetryingLlmClient::new(mock.clone(), policy(3));
        let start = tokio::time::Instant::now();

        let response = client.chat("hello", None).await.unwrap();

        assert_eq!(response.content(), "Success");
        assert_eq!(mock.call_count(), 3);
        // 1s + 2s of backoff
        assert_eq!(start.elapsed().as_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_keeps_cause() {
        let mock = Arc::new(MockLlmClientFactory.create_rate_limited(10));
        let client = RetryingLlmClient::new(mock.clone(), policy(1));

        let err = client.chat("hello", None).await.unwrap_err();

        match err {
            ProviderError::RetriesExhausted { max_retries, source } => {
                assert_eq!(max_retries, 1);
                assert_eq!(source.to_string(), "Rate limited");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let mock = Arc::new(
            MockLlmClient::new().with_error(ProviderError::configuration("mock", "bad key"), 0),
        );
        let client = RetryingLlmClient::new(mock.clone(), policy(3));

        let err = client
            .chat_with_messages(&[ChatMessage::user("x")], None)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Configuration { .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_wraps_boxed_client() {
        let boxed: Box<dyn LlmClient> = Box::new(MockLlmClient::new().with_model("m-1"));
        let client = RetryingLlmClient::from_boxed(boxed, RetryPolicy::no_retry());
        assert_eq!(client.model_id(), "m-1");
        assert_eq!(client.provider_name(), "mock");
        assert_eq!(client.chat("x", None).await.unwrap().content(), "Mock response");
    }
}
