//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Raised at the validation boundary where bad input or configuration is
/// detected. None of these are retryable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API key error: {0}")]
    ApiKey(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Temperature error: {0}")]
    Temperature(String),

    #[error("Input cannot be empty")]
    EmptyInput,

    #[error("Invalid version string '{0}': expected major.minor.patch")]
    InvalidVersion(String),

    #[error("Prompt template for step '{step}' references missing context key '{key}'")]
    MissingTemplateKey { step: String, key: String },

    #[error("Invalid message sequence: {0}")]
    InvalidMessageSequence(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        DomainError::Config(msg.into())
    }
}
