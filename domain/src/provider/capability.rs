//! Capability requirements used for provider routing

use super::version::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A named feature a caller wants from a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCapability {
    pub name: String,
    /// Only required capabilities filter candidates
    pub required: bool,
    /// Minimum provider version, if the feature is version-gated
    pub min_version: Option<Version>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl ProviderCapability {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            min_version: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    pub fn with_min_version(mut self, version: Version) -> Self {
        self.min_version = Some(version);
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}
