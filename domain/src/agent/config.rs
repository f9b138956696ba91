//! Agent-wide settings

use crate::core::error::DomainError;
use crate::generation::config::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_STEPS: u32 = 10;

/// Settings for one agent instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Enforced by the host, not by the step loop
    pub task_timeout: Duration,
    /// Step-level retries, on top of provider retries
    pub max_retries: u32,
    /// Ceiling on step attempts (including retries) per task
    pub max_steps: u32,
    pub streaming: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            max_steps: DEFAULT_MAX_STEPS,
            streaming: false,
        }
    }
}

impl AgentConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.model.trim().is_empty() {
            return Err(DomainError::InvalidModel("model name cannot be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(DomainError::Temperature(format!(
                "temperature must be between 0 and 1, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(DomainError::config("max_tokens must be positive"));
        }
        if self.task_timeout.is_zero() {
            return Err(DomainError::config("task_timeout must be positive"));
        }
        if self.max_steps == 0 {
            return Err(DomainError::config("max_steps must be positive"));
        }
        Ok(())
    }
}
