//! Provider configuration from TOML (`[providers]` section)

use serde::{Deserialize, Serialize};
use solver_domain::DomainError;

pub const GEMINI: &str = "gemini";

/// Gemini API provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGeminiConfig {
    /// Environment variable name for the API key (default: "GEMINI_API_KEY").
    pub api_key_env: String,
    /// Direct API key (not recommended, use the env var instead).
    pub api_key: Option<String>,
    /// Base URL for the Generative Language API.
    pub base_url: String,
}

impl Default for FileGeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    /// Provider activated at startup.
    pub default: String,
    /// Ordered fallback chain used when the active provider turns unhealthy.
    pub fallback: Vec<String>,
    /// Gemini API settings.
    pub gemini: FileGeminiConfig,
}

impl Default for FileProvidersConfig {
    fn default() -> Self {
        Self {
            default: GEMINI.to_string(),
            fallback: Vec::new(),
            gemini: FileGeminiConfig::default(),
        }
    }
}

impl FileProvidersConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.default.trim().is_empty() {
            return Err(DomainError::config("providers.default cannot be empty"));
        }
        if self.gemini.base_url.trim().is_empty() {
            return Err(DomainError::config("providers.gemini.base_url cannot be empty"));
        }
        Ok(())
    }
}
