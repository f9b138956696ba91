//! [`Provider`] implementation over a raw [`GenerationService`]

use super::retry::RetryPolicy;
use crate::ports::generation::{GenerationService, TextStream};
use crate::ports::provider::{Provider, ProviderError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use solver_domain::{GenerationConfig, GenerationOverrides};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Provider that adds config ownership and rate-limit retries to a
/// [`GenerationService`].
///
/// Empty responses are passed through untouched; deciding what to do with
/// them belongs to the lifecycle layer.
pub struct ServiceProvider {
    name: String,
    service: Arc<dyn GenerationService>,
    config: RwLock<GenerationConfig>,
    retry: RetryPolicy,
}

impl ServiceProvider {
    pub fn new(
        name: impl Into<String>,
        service: Arc<dyn GenerationService>,
        config: GenerationConfig,
    ) -> Result<Self, ProviderError> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            service,
            config: RwLock::new(config),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn effective_config(
        &self,
        overrides: GenerationOverrides,
    ) -> Result<GenerationConfig, ProviderError> {
        let stored = self.config();
        if overrides.is_empty() {
            return Ok(stored);
        }
        Ok(overrides.apply_to(&stored)?)
    }
}

#[async_trait]
impl Provider for ServiceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        overrides: GenerationOverrides,
    ) -> Result<String, ProviderError> {
        let config = self.effective_config(overrides)?;
        debug!(
            provider = %self.name,
            model = config.model(),
            prompt_len = prompt.len(),
            "Generating"
        );
        self.retry
            .run("generate", || self.service.generate(prompt, &config))
            .await
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        overrides: GenerationOverrides,
    ) -> Result<TextStream<ProviderError>, ProviderError> {
        let config = self.effective_config(overrides)?;
        debug!(
            provider = %self.name,
            model = config.model(),
            prompt_len = prompt.len(),
            "Opening stream"
        );
        let stream = self
            .retry
            .run("generate_stream", || {
                self.service.generate_stream(prompt, &config)
            })
            .await?;
        Ok(stream.map_err(ProviderError::from))
    }

    async fn count_tokens(&self, text: &str) -> Result<u64, ProviderError> {
        let config = self.config();
        self.retry
            .run("count_tokens", || self.service.count_tokens(text, &config))
            .await
    }

    fn config(&self) -> GenerationConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update_config(&self, changes: &Map<String, Value>) -> Result<(), ProviderError> {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.update(changes)?;
        debug!(provider = %self.name, keys = changes.len(), "Config updated");
        Ok(())
    }
}
