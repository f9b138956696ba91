//! Semantic versions and provider/model capability descriptors

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` version (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidVersion(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u32, DomainError> {
            parts
                .next()
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(invalid)
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl FromStr for Version {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Capabilities of a single model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: Version,
    pub capabilities: BTreeSet<String>,
    /// Oldest provider version able to serve this model
    pub min_provider_version: Option<Version>,
}

impl ModelVersion {
    pub fn new<I, S>(name: impl Into<String>, version: Version, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            version,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            min_provider_version: None,
        }
    }

    pub fn with_min_provider_version(mut self, version: Version) -> Self {
        self.min_provider_version = Some(version);
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Static description of what a provider can serve
///
/// Immutable once built; the default model is always one of the supported
/// models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderVersion {
    name: String,
    version: Version,
    supported_models: BTreeMap<String, ModelVersion>,
    default_model: String,
}

impl ProviderVersion {
    pub fn new(
        name: impl Into<String>,
        version: Version,
        models: impl IntoIterator<Item = ModelVersion>,
        default_model: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        let default_model = default_model.into();
        let supported_models: BTreeMap<_, _> =
            models.into_iter().map(|m| (m.name.clone(), m)).collect();

        if !supported_models.contains_key(&default_model) {
            return Err(DomainError::InvalidModel(format!(
                "default model '{}' is not supported by provider '{}'",
                default_model, name
            )));
        }

        Ok(Self {
            name,
            version,
            supported_models,
            default_model,
        })
    }

    /// Gemini v1 model catalogue
    pub fn gemini_v1() -> Self {
        let v1 = Version::new(1, 0, 0);
        let text = [
            "text-generation",
            "chat",
            "code-generation",
            "code-analysis",
        ];
        let models = vec![
            ModelVersion::new("gemini-2.0-flash-lite", v1, text),
            ModelVersion::new("gemini-pro", v1, text),
            ModelVersion::new(
                "gemini-pro-vision",
                v1,
                ["text-generation", "chat", "image-analysis", "multimodal"],
            ),
        ];
        Self {
            name: "gemini".to_string(),
            version: v1,
            supported_models: models.into_iter().map(|m| (m.name.clone(), m)).collect(),
            default_model: "gemini-2.0-flash-lite".to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.supported_models.keys().map(String::as_str)
    }

    /// Resolve a model by name, or the default model when `None`
    pub fn get_model(&self, name: Option<&str>) -> Result<&ModelVersion, DomainError> {
        let name = name.unwrap_or(&self.default_model);
        self.supported_models.get(name).ok_or_else(|| {
            DomainError::InvalidModel(format!(
                "model '{}' is not supported by provider '{}'",
                name, self.name
            ))
        })
    }

    /// Whether `model` (default model when `None`) offers `capability` and
    /// this provider is new enough to serve it
    pub fn supports_capability(&self, capability: &str, model: Option<&str>) -> bool {
        let Ok(model) = self.get_model(model) else {
            return false;
        };
        let recent_enough = model
            .min_provider_version
            .is_none_or(|min| self.version >= min);
        recent_enough && model.has_capability(capability)
    }
}
