//! Provider adapters, registry and client factory
//!
//! Each vendor module exposes a [`ProviderDescriptor`]; the [`ProviderRegistry`]
//! maps provider names to descriptors and the [`ClientFactory`] resolves
//! settings and builds one [`LlmClient`] per request.

pub mod adapter;
pub mod anthropic;
mod endpoint;
pub mod error;
pub mod factory;
pub mod google;
pub mod grok;
pub mod mock;
pub mod openai;
pub mod registry;
pub mod retrying;

pub use adapter::{
    resolve_model, ClientSettings, LlmClient, ModelTable, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
pub use error::{ProviderError, ProviderResult};
pub use factory::{
    get_client, list_available_models, test_connection, ClientFactory, ClientOptions,
    DEFAULT_PROVIDER,
};
pub use registry::{builtin, ClientConstructor, ProviderDescriptor, ProviderRegistry};

// Re-export concrete providers
pub use anthropic::AnthropicClient;
pub use google::GoogleClient;
pub use grok::GrokClient;
pub use mock::{MockLlmClient, MockLlmClientFactory, RecordedCall};
pub use openai::OpenAiClient;
pub use retrying::RetryingLlmClient;
