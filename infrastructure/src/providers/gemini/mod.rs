//! Google Gemini provider

pub mod client;
mod sse;
pub mod types;

pub use client::GeminiClient;

use solver_application::{
    Provider, ProviderError, ProviderRegistry, RegistryError, RetryPolicy, ServiceProvider,
};
use solver_domain::{DomainError, GenerationConfig, ProviderVersion};
use std::sync::Arc;

pub const PROVIDER_NAME: &str = "gemini";

/// Everything needed to construct a Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Used when the constructor is not handed a key
    pub api_key: Option<String>,
    /// Environment variable named in the error when no key is available
    pub api_key_env: String,
    pub base_url: String,
    pub generation: GenerationConfig,
    pub retry: RetryPolicy,
}

/// Register the Gemini constructor under [`PROVIDER_NAME`].
///
/// The constructor fails with an API-key error when neither the caller
/// nor `settings` supplies a key.
pub fn register_gemini(
    registry: &ProviderRegistry,
    settings: GeminiSettings,
) -> Result<(), RegistryError> {
    registry.register_provider(
        PROVIDER_NAME,
        ProviderVersion::gemini_v1(),
        Arc::new(move |api_key: Option<String>| build_provider(&settings, api_key)),
    )
}

fn build_provider(
    settings: &GeminiSettings,
    api_key: Option<String>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = api_key
        .or_else(|| settings.api_key.clone())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            DomainError::ApiKey(format!(
                "{} environment variable is not set",
                settings.api_key_env
            ))
        })?;

    let client = GeminiClient::new(api_key, settings.base_url.as_str())?;
    let provider = ServiceProvider::new(PROVIDER_NAME, Arc::new(client), settings.generation.clone())?
        .with_retry_policy(settings.retry);
    Ok(Arc::new(provider))
}
