//! Recognised generation parameter keys.
//!
//! Anything outside this set is kept verbatim in the config's `extra` map.

use std::fmt;

/// A recognised [`GenerationConfig`](super::config::GenerationConfig) key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationKey {
    Model,
    Temperature,
    MaxTokens,
    TopP,
    TopK,
}

impl GenerationKey {
    pub const ALL: [GenerationKey; 5] = [
        GenerationKey::Model,
        GenerationKey::Temperature,
        GenerationKey::MaxTokens,
        GenerationKey::TopP,
        GenerationKey::TopK,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKey::Model => "model",
            GenerationKey::Temperature => "temperature",
            GenerationKey::MaxTokens => "max_tokens",
            GenerationKey::TopP => "top_p",
            GenerationKey::TopK => "top_k",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GenerationKey::Model => "Model name (non-empty)",
            GenerationKey::Temperature => "Sampling temperature in [0, 1]",
            GenerationKey::MaxTokens => "Maximum output tokens (> 0)",
            GenerationKey::TopP => "Nucleus sampling probability in [0, 1]",
            GenerationKey::TopK => "Top-k sampling cutoff (> 0)",
        }
    }

    /// Look up a key by name; `None` means the key belongs in `extra`
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for GenerationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_existing_key() {
        assert_eq!(GenerationKey::lookup("top_k"), Some(GenerationKey::TopK));
        assert_eq!(GenerationKey::lookup("max_tokens"), Some(GenerationKey::MaxTokens));
    }

    #[test]
    fn test_lookup_unknown_key() {
        assert!(GenerationKey::lookup("candidate_count").is_none());
        assert!(GenerationKey::lookup("Temperature").is_none());
    }

    #[test]
    fn test_every_key_has_description() {
        for key in GenerationKey::ALL {
            assert!(!key.description().is_empty(), "{} lacks a description", key);
        }
    }
}
