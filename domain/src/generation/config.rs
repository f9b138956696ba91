//! Generation configuration value object

use super::key::GenerationKey;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_TOP_P: f64 = 0.95;
pub const DEFAULT_TOP_K: u32 = 40;

/// Validated generation parameters (Value Object)
///
/// Every constructor and mutator re-validates, so a `GenerationConfig` in
/// hand always satisfies its range checks. Unknown parameters survive in
/// `extra` so provider-specific knobs pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    model: String,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    top_k: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, Value>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            extra: BTreeMap::new(),
        }
    }
}

impl GenerationConfig {
    /// Default parameters for the given model
    pub fn for_model(model: impl Into<String>) -> Result<Self, DomainError> {
        let config = Self {
            model: model.into(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    // ==================== Builders ====================

    pub fn with_temperature(mut self, temperature: f64) -> Result<Self, DomainError> {
        self.temperature = temperature;
        self.validate()?;
        Ok(self)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Result<Self, DomainError> {
        self.max_tokens = max_tokens;
        self.validate()?;
        Ok(self)
    }

    pub fn with_top_p(mut self, top_p: f64) -> Result<Self, DomainError> {
        self.top_p = top_p;
        self.validate()?;
        Ok(self)
    }

    pub fn with_top_k(mut self, top_k: u32) -> Result<Self, DomainError> {
        self.top_k = top_k;
        self.validate()?;
        Ok(self)
    }

    // ==================== Accessors ====================

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn top_p(&self) -> f64 {
        self.top_p
    }

    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    // ==================== Validation & Merging ====================

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.model.trim().is_empty() {
            return Err(DomainError::config("model name cannot be empty"));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(DomainError::config(format!(
                "temperature must be between 0 and 1, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(DomainError::config("max_tokens must be positive"));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(DomainError::config(format!(
                "top_p must be between 0 and 1, got {}",
                self.top_p
            )));
        }
        if self.top_k == 0 {
            return Err(DomainError::config("top_k must be positive"));
        }
        Ok(())
    }

    /// Merge `changes` into this config.
    ///
    /// Recognised keys replace their field, anything else is stored in
    /// `extra`. The merged result is validated before it is committed; on
    /// error `self` is left unchanged.
    pub fn update(&mut self, changes: &Map<String, Value>) -> Result<(), DomainError> {
        let mut next = self.clone();
        for (name, value) in changes {
            next.apply(name, value)?;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Flatten into a single map; `extra` entries sit beside the known keys
    pub fn to_dict(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (name, value) in &self.extra {
            map.insert(name.clone(), value.clone());
        }
        map.insert(GenerationKey::Model.as_str().into(), Value::from(self.model.clone()));
        map.insert(GenerationKey::Temperature.as_str().into(), Value::from(self.temperature));
        map.insert(GenerationKey::MaxTokens.as_str().into(), Value::from(self.max_tokens));
        map.insert(GenerationKey::TopP.as_str().into(), Value::from(self.top_p));
        map.insert(GenerationKey::TopK.as_str().into(), Value::from(self.top_k));
        map
    }

    /// Inverse of [`to_dict`](Self::to_dict); missing keys take defaults
    pub fn from_dict(map: &Map<String, Value>) -> Result<Self, DomainError> {
        let mut config = Self::default();
        config.update(map)?;
        Ok(config)
    }

    fn apply(&mut self, name: &str, value: &Value) -> Result<(), DomainError> {
        let Some(key) = GenerationKey::lookup(name) else {
            self.extra.insert(name.to_string(), value.clone());
            return Ok(());
        };
        match key {
            GenerationKey::Model => {
                self.model = value
                    .as_str()
                    .ok_or_else(|| type_error(key, "a string"))?
                    .to_string();
            }
            GenerationKey::Temperature => {
                self.temperature = value.as_f64().ok_or_else(|| type_error(key, "a number"))?;
            }
            GenerationKey::TopP => {
                self.top_p = value.as_f64().ok_or_else(|| type_error(key, "a number"))?;
            }
            GenerationKey::MaxTokens => {
                self.max_tokens = as_u32(value).ok_or_else(|| type_error(key, "a positive integer"))?;
            }
            GenerationKey::TopK => {
                self.top_k = as_u32(value).ok_or_else(|| type_error(key, "a positive integer"))?;
            }
        }
        Ok(())
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

fn type_error(key: GenerationKey, expected: &str) -> DomainError {
    DomainError::config(format!("{} must be {}", key, expected))
}

/// Per-call overrides for `generate`
///
/// Applied to a copy of the stored config for one request only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOverrides {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl GenerationOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.max_tokens.is_none() && self.temperature.is_none()
    }

    /// Effective config for a single call
    pub fn apply_to(&self, base: &GenerationConfig) -> Result<GenerationConfig, DomainError> {
        let mut effective = base.clone();
        if let Some(max_tokens) = self.max_tokens {
            effective = effective.with_max_tokens(max_tokens)?;
        }
        if let Some(temperature) = self.temperature {
            effective = effective.with_temperature(temperature)?;
        }
        Ok(effective)
    }
}
