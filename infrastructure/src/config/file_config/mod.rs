//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Conversion into domain types happens in [`FileConfig::validate`] and the
//! per-section `to_*` methods.

mod agent;
mod generation;
mod providers;
mod retry;

pub use agent::FileAgentConfig;
pub use generation::FileGenerationConfig;
pub use providers::{FileGeminiConfig, FileProvidersConfig};
pub use retry::FileRetryConfig;

use serde::{Deserialize, Serialize};
use solver_domain::{AgentConfig, DomainError};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Default generation parameters
    pub generation: FileGenerationConfig,
    /// Step sequencing settings
    pub agent: FileAgentConfig,
    /// Provider-level backoff for rate-limited calls
    pub retry: FileRetryConfig,
    /// Provider selection and credentials
    pub providers: FileProvidersConfig,
}

impl FileConfig {
    /// Validate every section, failing on the first invalid value
    pub fn validate(&self) -> Result<(), DomainError> {
        self.generation.to_generation_config()?;
        self.to_agent_config()?;
        self.retry.validate()?;
        self.providers.validate()
    }

    /// Agent settings merged with the generation defaults
    pub fn to_agent_config(&self) -> Result<AgentConfig, DomainError> {
        let config = self.agent.to_agent_config(&self.generation);
        config.validate()?;
        Ok(config)
    }
}
