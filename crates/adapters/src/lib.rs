//! Concrete provider adapters
//!
//! One `ProviderAdapter` per supported provider. Each adapter owns a cloned
//! `reqwest::Client` (cheap, shared pool) and a base URL, extracts its own
//! credential format, and maps the provider's response shapes to an `Outcome`.
//!
//! Adapters are stateless: classification state lives in `key-pool`.

pub mod anthropic;
pub mod bedrock;
pub mod constants;
pub mod elevenlabs;
pub mod google;
pub mod openai;
pub mod openrouter;
pub mod sigv4;

pub use anthropic::AnthropicAdapter;
pub use bedrock::BedrockAdapter;
pub use elevenlabs::ElevenLabsAdapter;
pub use google::GoogleAdapter;
pub use openai::OpenAiAdapter;
pub use openrouter::OpenRouterAdapter;

use std::sync::Arc;

use provider::ProviderAdapter;

/// Names of every supported provider, in registry order.
pub const PROVIDER_NAMES: &[&str] = &[
    openai::NAME,
    anthropic::NAME,
    google::NAME,
    bedrock::NAME,
    elevenlabs::NAME,
    openrouter::NAME,
];

/// Build the adapter for `name`, or `None` if the provider is not supported.
pub fn by_name(name: &str, client: &reqwest::Client) -> Option<Arc<dyn ProviderAdapter>> {
    let client = client.clone();
    let adapter: Arc<dyn ProviderAdapter> = match name {
        openai::NAME => Arc::new(OpenAiAdapter::new(client)),
        anthropic::NAME => Arc::new(AnthropicAdapter::new(client)),
        google::NAME => Arc::new(GoogleAdapter::new(client)),
        bedrock::NAME => Arc::new(BedrockAdapter::new(client)),
        elevenlabs::NAME => Arc::new(ElevenLabsAdapter::new(client)),
        openrouter::NAME => Arc::new(OpenRouterAdapter::new(client)),
        _ => return None,
    };
    Some(adapter)
}

/// Every supported adapter, sharing one client.
pub fn all(client: &reqwest::Client) -> Vec<Arc<dyn ProviderAdapter>> {
    PROVIDER_NAMES
        .iter()
        .filter_map(|name| by_name(name, client))
        .collect()
}
