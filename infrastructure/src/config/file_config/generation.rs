//! Generation defaults from TOML (`[generation]` section)

use serde::{Deserialize, Serialize};
use solver_domain::generation::config::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P,
};
use solver_domain::{DomainError, GenerationConfig};

/// Raw generation configuration from TOML
///
/// # Example
///
/// ```toml
/// [generation]
/// model = "gemini-2.0-flash-lite"
/// temperature = 0.7      # 0.0 ..= 1.0
/// max_tokens = 2048
/// top_p = 0.95
/// top_k = 40
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGenerationConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub top_k: u32,
}

impl Default for FileGenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl FileGenerationConfig {
    /// Convert into a validated [`GenerationConfig`]
    pub fn to_generation_config(&self) -> Result<GenerationConfig, DomainError> {
        GenerationConfig::for_model(self.model.as_str())?
            .with_temperature(self.temperature)?
            .with_max_tokens(self.max_tokens)?
            .with_top_p(self.top_p)?
            .with_top_k(self.top_k)
    }
}
