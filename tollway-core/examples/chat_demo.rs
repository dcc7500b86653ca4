//! Chat demo
//!
//! Loads `.env`, builds a client through the factory, wraps it with retry and
//! sends one prompt. Without credentials it falls back to the mock provider.
//!
//! Run with: cargo run --example chat_demo -- [provider] [model]

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tollway_core::config::{load_env, EnvSource};
use tollway_core::providers::{
    list_available_models, mock, ClientFactory, ClientOptions, LlmClient, ProviderRegistry,
    RetryingLlmClient,
};
use tollway_core::retry::RetryPolicy;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    load_env(None, false).context("loading .env")?;

    let mut args = std::env::args().skip(1);
    let provider = args.next();
    let model = args.next();

    println!("Available models:");
    for (provider, models) in list_available_models() {
        println!("  {provider}: {}", models.join(", "));
    }

    let mut registry = ProviderRegistry::with_builtin_providers();
    registry.register(mock::DESCRIPTOR);
    let factory = ClientFactory::new(Arc::new(registry), Arc::new(EnvSource));

    let mut options = ClientOptions::new();
    if let Some(provider) = &provider {
        options = options.provider(provider);
    }
    if let Some(model) = &model {
        options = options.model(model);
    }

    let client = match factory.get_client(options) {
        Ok(client) => client,
        Err(e) => {
            println!("Falling back to the mock provider: {e}");
            factory.get_client(ClientOptions::new().provider(mock::NAME))?
        }
    };

    let client = RetryingLlmClient::from_boxed(
        client,
        RetryPolicy::new(3).with_delays(Duration::from_millis(500), Duration::from_secs(10)),
    );

    let response = client
        .chat("Name three prime numbers.", Some("Answer in one line."))
        .await?;

    println!("\n[{} / {}]", response.provider(), response.model());
    println!("{}", response.content());
    println!(
        "tokens: {} in, {} out",
        response.input_tokens(),
        response.output_tokens()
    );
    Ok(())
}
