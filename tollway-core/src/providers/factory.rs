//! Client factory
//!
//! Resolves provider, model, credential and sampling settings (explicit
//! option, then configuration, then the provider's default) and constructs one
//! new adapter per call.

use super::adapter::{ClientSettings, LlmClient, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use super::registry::{self, ProviderDescriptor, ProviderRegistry};
use crate::config::{
    ConfigError, ConfigResult, ConfigSource, EnvSource, SecretString, LLM_BASE_URL,
    LLM_MAX_TOKENS, LLM_MODEL, LLM_PROVIDER, LLM_TEMPERATURE,
};
use crate::http::HttpTransport;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Provider used when neither the caller nor the configuration names one
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// Prompt sent by [`ClientFactory::test_connection`]
pub const TEST_PROMPT: &str = "Say 'Hello' and nothing else.";

/// Explicit overrides for [`ClientFactory::get_client`]; unset fields fall
/// back to configuration and then to provider defaults
#[derive(Clone, Default)]
pub struct ClientOptions {
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<SecretString>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    base_url: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Route requests through `transport` instead of a new HTTP client
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

/// Builds clients from a registry and a configuration source
#[derive(Clone)]
pub struct ClientFactory {
    registry: Arc<ProviderRegistry>,
    source: Arc<dyn ConfigSource>,
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory")
            .field("providers", &self.registry.names())
            .finish_non_exhaustive()
    }
}

impl ClientFactory {
    pub fn new(registry: Arc<ProviderRegistry>, source: Arc<dyn ConfigSource>) -> Self {
        Self { registry, source }
    }

    /// Built-in providers configured from the process environment
    pub fn from_env() -> Self {
        Self::new(registry::builtin(), Arc::new(EnvSource))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Resolve settings and construct a new client
    pub fn get_client(&self, options: ClientOptions) -> ConfigResult<Box<dyn LlmClient>> {
        let provider = options
            .provider
            .or_else(|| self.source.get_string(LLM_PROVIDER))
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
            .to_lowercase();

        let descriptor =
            self.registry
                .get(&provider)
                .ok_or_else(|| ConfigError::UnknownProvider {
                    provider: provider.clone(),
                    available: self.registry.names(),
                })?;

        let model = options
            .model
            .or_else(|| self.source.get_string(LLM_MODEL))
            .unwrap_or_else(|| descriptor.default_model.to_string());

        let api_key = self.resolve_credential(descriptor, options.api_key)?;

        let max_tokens = match options.max_tokens {
            Some(max_tokens) => max_tokens,
            None => self
                .source
                .get_u32(LLM_MAX_TOKENS)?
                .unwrap_or(DEFAULT_MAX_TOKENS),
        };
        let temperature = match options.temperature {
            Some(temperature) => temperature,
            None => self
                .source
                .get_float(LLM_TEMPERATURE)?
                .unwrap_or(DEFAULT_TEMPERATURE),
        };
        let base_url = options
            .base_url
            .or_else(|| self.source.get_string(LLM_BASE_URL));

        info!("Initializing {} client with model: {}", provider, model);

        let settings = ClientSettings {
            model,
            api_key,
            max_tokens,
            temperature,
            base_url,
            transport: options.transport,
        };
        (descriptor.construct)(settings)
            .map_err(|source| ConfigError::ClientConstruction { provider, source })
    }

    /// An explicit key wins over the configured one; both must be real values
    fn resolve_credential(
        &self,
        descriptor: &ProviderDescriptor,
        explicit: Option<SecretString>,
    ) -> ConfigResult<SecretString> {
        let env_var = descriptor.api_key_var();
        let api_key = explicit
            .filter(|key| !key.is_empty())
            .or_else(|| self.source.get_string(&env_var).map(SecretString::new));

        match api_key {
            Some(key) if key.is_placeholder() => Err(ConfigError::PlaceholderCredential {
                provider: descriptor.name.to_string(),
                env_var,
            }),
            Some(key) => Ok(key),
            None if !descriptor.requires_credential => Ok(SecretString::default()),
            None => Err(ConfigError::MissingCredential {
                provider: descriptor.name.to_string(),
                env_var,
            }),
        }
    }

    /// Provider name -> model alias names
    pub fn list_available_models(&self) -> BTreeMap<String, Vec<String>> {
        self.registry
            .iter()
            .map(|descriptor| (descriptor.name.to_lowercase(), descriptor.model_names()))
            .collect()
    }

    /// Send a trivial prompt and report whether it succeeded
    pub async fn test_connection(&self, provider: Option<&str>, model: Option<&str>) -> bool {
        let mut options = ClientOptions::new();
        if let Some(provider) = provider {
            options = options.provider(provider);
        }
        if let Some(model) = model {
            options = options.model(model);
        }

        let client = match self.get_client(options) {
            Ok(client) => client,
            Err(e) => {
                error!("Connection test failed: {}", e);
                return false;
            }
        };

        match client.chat(TEST_PROMPT, None).await {
            Ok(response) => {
                let preview: String = response.content().chars().take(50).collect();
                info!("Test successful. Response: {}...", preview);
                true
            }
            Err(e) => {
                error!("Connection test failed: {}", e);
                false
            }
        }
    }
}

/// [`ClientFactory::get_client`] with the built-in providers and the process environment
pub fn get_client(options: ClientOptions) -> ConfigResult<Box<dyn LlmClient>> {
    ClientFactory::from_env().get_client(options)
}

/// [`ClientFactory::list_available_models`] for the built-in providers
pub fn list_available_models() -> BTreeMap<String, Vec<String>> {
    ClientFactory::from_env().list_available_models()
}

/// [`ClientFactory::test_connection`] with the built-in providers and the process environment
pub async fn test_connection(provider: Option<&str>, model: Option<&str>) -> bool {
    ClientFactory::from_env()
        .test_connection(provider, model)
        .await
}
