//! Provider lifecycle state, health snapshot and usage statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error rate above which a provider is considered unhealthy.
/// Exactly this rate is still healthy.
pub const MAX_ERROR_RATE: f64 = 0.2;

/// Lifecycle state of a provider instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderState {
    Initializing,
    Ready,
    Busy,
    Error,
    Shutdown,
}

impl ProviderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderState::Initializing => "initializing",
            ProviderState::Ready => "ready",
            ProviderState::Busy => "busy",
            ProviderState::Error => "error",
            ProviderState::Shutdown => "shutdown",
        }
    }

    /// `Shutdown` is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProviderState::Shutdown)
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health snapshot of a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub last_check: Option<DateTime<Utc>>,
    pub total_requests: u64,
    pub failed_requests: u64,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            is_healthy: true,
            error_count: 0,
            last_error: None,
            last_check: None,
            total_requests: 0,
            failed_requests: 0,
        }
    }
}

impl HealthStatus {
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.failed_requests as f64 / self.total_requests as f64
        }
    }

    pub fn error_rate_exceeded(&self) -> bool {
        self.error_rate() > MAX_ERROR_RATE
    }

    /// Count one failed request
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failed_requests += 1;
        self.error_count += 1;
        self.last_error = Some(error.into());
    }
}

/// Accumulated usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub total_tokens: u64,
    pub total_cost: f64,
    pub requests_per_minute: f64,
    pub avg_tokens_per_request: f64,
    pub last_request_at: Option<DateTime<Utc>>,
}

impl ProviderStats {
    /// Fold one request into the totals.
    ///
    /// `total_requests` is the request count including this one. The rate
    /// estimate comes from the gap to the previous request and is left
    /// alone for the first request or a zero gap.
    pub fn record(&mut self, tokens: u64, cost: f64, at: DateTime<Utc>, total_requests: u64) {
        self.total_tokens += tokens;
        self.total_cost += cost;

        if let Some(previous) = self.last_request_at {
            let elapsed = (at - previous).num_milliseconds() as f64 / 1000.0;
            if elapsed > 0.0 {
                self.requests_per_minute = 60.0 / elapsed;
            }
        }
        self.last_request_at = Some(at);

        if total_requests > 0 {
            self.avg_tokens_per_request = self.total_tokens as f64 / total_requests as f64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_error_rate_threshold_is_exclusive() {
        let mut health = HealthStatus {
            total_requests: 10,
            failed_requests: 2,
            ..Default::default()
        };
        assert!(!health.error_rate_exceeded());

        health.failed_requests = 3;
        assert!(health.error_rate_exceeded());
    }

    #[test]
    fn test_no_requests_means_zero_rate() {
        assert_eq!(HealthStatus::default().error_rate(), 0.0);
    }

    #[test]
    fn test_record_failure() {
        let mut health = HealthStatus::default();
        health.record_failure("boom");
        assert_eq!(health.failed_requests, 1);
        assert_eq!(health.error_count, 1);
        assert_eq!(health.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_stats_rate_and_average() {
        let start = Utc::now();
        let mut stats = ProviderStats::default();

        stats.record(100, 0.5, start, 1);
        assert_eq!(stats.requests_per_minute, 0.0);
        assert_eq!(stats.avg_tokens_per_request, 100.0);

        stats.record(50, 0.25, start + Duration::seconds(30), 2);
        assert_eq!(stats.total_tokens, 150);
        assert_eq!(stats.total_cost, 0.75);
        assert_eq!(stats.requests_per_minute, 2.0);
        assert_eq!(stats.avg_tokens_per_request, 75.0);
    }

    #[test]
    fn test_zero_gap_keeps_previous_rate() {
        let at = Utc::now();
        let mut stats = ProviderStats::default();
        stats.record(1, 0.0, at, 1);
        stats.record(1, 0.0, at, 2);
        assert_eq!(stats.requests_per_minute, 0.0);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        assert!(ProviderState::Shutdown.is_terminal());
        assert!(!ProviderState::Error.is_terminal());
    }
}
