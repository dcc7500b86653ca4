//! Tollway Core Library
//!
//! This crate provides a provider-agnostic LLM client layer together with the
//! plumbing that keeps it well behaved against real APIs:
//! - Error classification and exponential-backoff retry
//! - A token-bucket rate limiter and rate-limited/retrying HTTP transports
//! - A provider registry, per-vendor adapters and a client factory
//!
//! ```no_run
//! use tollway_core::providers::{get_client, ClientOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = get_client(ClientOptions::new().provider("openai").model("gpt-4o"))?;
//! let response = client.chat("Hello!", None).await?;
//! println!("{} ({} tokens)", response.content(), response.total_tokens());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod retry;

pub use config::{ConfigError, ConfigSource, EnvSource, MapSource, SecretString};
pub use http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpTransport, RateLimitConfig,
    RateLimitedClient, RateLimiter, RetryingClient, TransportError,
};
pub use protocol::{ChatMessage, MessageRole, NormalizedResponse, Usage};
pub use providers::{
    get_client, ClientFactory, ClientOptions, LlmClient, ProviderError, ProviderRegistry,
};
pub use retry::{is_retryable, RetryError, RetryExecutor, RetryPolicy, Retryable, TaggedError};

/// Returns the version of the Tollway Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
