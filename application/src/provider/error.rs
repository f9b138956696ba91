//! Provider management errors

use crate::ports::provider::ProviderError;
use solver_domain::DomainError;
use thiserror::Error;

/// Errors from provider registration, selection and fallback
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Temperature error: {0}")]
    Temperature(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Retry error: {0}")]
    Retry(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<DomainError> for RegistryError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidModel(msg) => RegistryError::InvalidModel(msg),
            DomainError::Temperature(msg) => RegistryError::Temperature(msg),
            other => RegistryError::Provider(ProviderError::Config(other)),
        }
    }
}
