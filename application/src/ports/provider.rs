//! Provider port
//!
//! A provider is the application's view of one text-generation backend:
//! it owns a [`GenerationConfig`], applies per-call overrides and hides the
//! backend's retry/backoff handling. Concrete providers wrap a
//! [`GenerationService`](super::generation::GenerationService); test
//! doubles implement the trait directly.

use super::generation::{ServiceError, TextStream};
use async_trait::async_trait;
use serde_json::{Map, Value};
use solver_domain::{DomainError, GenerationConfig, GenerationOverrides};
use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Provider returned empty response")]
    EmptyResponse,

    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    #[error("Provider '{0}' has been shut down")]
    Shutdown(String),

    #[error(transparent)]
    Config(#[from] DomainError),
}

impl ProviderError {
    /// Worth retrying locally, inside the provider's backoff loop
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }

    /// A runtime failure rather than a configuration or validation error
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_)
                | ProviderError::Request(_)
                | ProviderError::EmptyResponse
                | ProviderError::RetryExhausted { .. }
        )
    }
}

impl From<ServiceError> for ProviderError {
    fn from(e: ServiceError) -> Self {
        if e.is_rate_limited() {
            ProviderError::RateLimited(e.message)
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

/// Text-generation provider
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// Generate a complete response.
    ///
    /// `overrides` apply to this call only and never change the stored
    /// config.
    async fn generate(
        &self,
        prompt: &str,
        overrides: GenerationOverrides,
    ) -> Result<String, ProviderError>;

    /// Open a streaming response. Each call issues a new request.
    async fn generate_stream(
        &self,
        prompt: &str,
        overrides: GenerationOverrides,
    ) -> Result<TextStream<ProviderError>, ProviderError>;

    async fn count_tokens(&self, text: &str) -> Result<u64, ProviderError>;

    /// Snapshot of the stored config
    fn config(&self) -> GenerationConfig;

    /// Merge `changes` into the stored config; unknown keys go to `extra`
    fn update_config(&self, changes: &Map<String, Value>) -> Result<(), ProviderError>;

    fn validate_config(&self) -> Result<(), ProviderError> {
        self.config().validate().map_err(ProviderError::from)
    }
}
