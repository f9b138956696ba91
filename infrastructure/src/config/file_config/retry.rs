//! Provider retry configuration from TOML (`[retry]` section)

use serde::{Deserialize, Serialize};
use solver_application::RetryPolicy;
use solver_domain::DomainError;
use std::time::Duration;

/// Raw retry configuration from TOML
///
/// Applies to rate-limited generation calls only. The delay before retry
/// `n` is `base_delay_ms * 2^(n-1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
        }
    }
}

impl FileRetryConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_attempts == 0 {
            return Err(DomainError::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_policy_default() {
        let policy = FileRetryConfig::default().to_retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = FileRetryConfig {
            max_attempts: 0,
            base_delay_ms: 10,
        };
        assert!(config.validate().is_err());
    }
}
