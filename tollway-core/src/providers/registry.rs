//! Provider registry
//!
//! Maps provider names to [`ProviderDescriptor`]s. The built-in registry is
//! assembled once on first use and shared read-only afterwards; callers that
//! need extra providers build their own [`ProviderRegistry`] and hand it to a
//! [`super::ClientFactory`].

use super::adapter::{resolve_model, ClientSettings, LlmClient, ModelTable};
use super::error::ProviderResult;
use super::{anthropic, google, grok, openai};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// Builds a client from resolved settings
pub type ClientConstructor = fn(ClientSettings) -> ProviderResult<Box<dyn LlmClient>>;

/// Everything the factory needs to know about a provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    /// Registry key, e.g. "openai"
    pub name: &'static str,
    /// Credential variable; `<NAME>_API_KEY` when unset
    pub api_key_env: Option<&'static str>,
    /// Model used when neither the caller nor the configuration names one
    pub default_model: &'static str,
    /// Friendly model aliases
    pub models: ModelTable,
    /// Whether the factory must find a credential before construction
    pub requires_credential: bool,
    pub construct: ClientConstructor,
}

impl ProviderDescriptor {
    /// Name of the variable holding this provider's credential
    pub fn api_key_var(&self) -> String {
        match self.api_key_env {
            Some(var) => var.to_string(),
            None => format!("{}_API_KEY", self.name.to_uppercase()),
        }
    }

    /// Alias names from the model table
    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|(alias, _)| alias.to_string()).collect()
    }

    /// Vendor model id for a requested name
    pub fn resolve_model(&self, name: &str) -> String {
        resolve_model(self.models, name)
    }
}

/// Name-keyed provider table
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderDescriptor>,
}

impl ProviderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding anthropic, google, grok and openai
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        for descriptor in [
            anthropic::DESCRIPTOR,
            openai::DESCRIPTOR,
            google::DESCRIPTOR,
            grok::DESCRIPTOR,
        ] {
            registry.register(descriptor);
        }
        registry
    }

    /// Add a provider, replacing and returning any previous entry of the same name.
    /// Names are case-insensitive and stored lowercased.
    pub fn register(&mut self, descriptor: ProviderDescriptor) -> Option<ProviderDescriptor> {
        self.providers
            .insert(descriptor.name.to_lowercase(), descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.providers.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(&name.to_lowercase())
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// The process-wide built-in registry
pub fn builtin() -> Arc<ProviderRegistry> {
    static BUILTIN: OnceLock<Arc<ProviderRegistry>> = OnceLock::new();
    BUILTIN
        .get_or_init(|| Arc::new(ProviderRegistry::with_builtin_providers()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock;

    #[test]
    fn test_builtin_names() {
        assert_eq!(
            builtin().names(),
            vec!["anthropic", "google", "grok", "openai"]
        );
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = ProviderRegistry::with_builtin_providers();
        let replacement = ProviderDescriptor {
            default_model: "gpt-4.1",
            ..openai::DESCRIPTOR
        };

        let previous = registry.register(replacement).unwrap();
        assert_eq!(previous.default_model, "gpt-4o");
        assert_eq!(registry.get("openai").unwrap().default_model, "gpt-4.1");
        assert_eq!(registry.len(), 4);

        assert!(registry.register(mock::DESCRIPTOR).is_none());
        assert!(registry.contains("mock"));
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderDescriptor {
            name: "Custom",
            ..mock::DESCRIPTOR
        });

        assert_eq!(registry.names(), vec!["custom"]);
        assert!(registry.contains("custom"));
        assert_eq!(registry.get("CUSTOM").unwrap().name, "Custom");

        let previous = registry.register(ProviderDescriptor {
            name: "custom",
            ..mock::DESCRIPTOR
        });
        assert_eq!(previous.unwrap().name, "Custom");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_api_key_var() {
        assert_eq!(grok::DESCRIPTOR.api_key_var(), "XAI_API_KEY");
        let custom = ProviderDescriptor {
            name: "mistral",
            api_key_env: None,
            ..openai::DESCRIPTOR
        };
        assert_eq!(custom.api_key_var(), "MISTRAL_API_KEY");
    }
}
