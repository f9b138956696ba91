//! Agent configuration from TOML (`[agent]` section)

use super::FileGenerationConfig;
use serde::{Deserialize, Serialize};
use solver_domain::AgentConfig;
use solver_domain::agent::config::{DEFAULT_MAX_RETRIES, DEFAULT_MAX_STEPS, DEFAULT_TASK_TIMEOUT};
use std::time::Duration;

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// max_retries = 3          # step-level retries
/// max_steps = 10           # ceiling on step attempts per task
/// task_timeout_secs = 300
/// streaming = false
/// ```
///
/// Model and sampling settings are in the `[generation]` section, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub max_retries: u32,
    pub max_steps: u32,
    pub task_timeout_secs: u64,
    pub streaming: bool,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            max_steps: DEFAULT_MAX_STEPS,
            task_timeout_secs: DEFAULT_TASK_TIMEOUT.as_secs(),
            streaming: false,
        }
    }
}

impl FileAgentConfig {
    /// Build an [`AgentConfig`] (not yet validated)
    pub fn to_agent_config(&self, generation: &FileGenerationConfig) -> AgentConfig {
        AgentConfig::default()
            .with_model(generation.model.as_str())
            .with_temperature(generation.temperature)
            .with_max_tokens(generation.max_tokens)
            .with_task_timeout(Duration::from_secs(self.task_timeout_secs))
            .with_max_retries(self.max_retries)
            .with_max_steps(self.max_steps)
            .with_streaming(self.streaming)
    }
}
