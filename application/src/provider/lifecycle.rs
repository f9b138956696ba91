//! Provider lifecycle: state machine, health checks and usage stats
//!
//! ```text
//! Initializing → Ready ⇄ Busy
//!       ↓          ↓
//!     Error      Shutdown (terminal, via cleanup)
//! ```

use crate::ports::provider::{Provider, ProviderError};
use chrono::Utc;
use solver_domain::{
    GenerationOverrides, HealthStatus, ProviderState, ProviderStats, ProviderVersion,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

const HIGH_ERROR_RATE: &str = "High error rate";
const EMPTY_RESPONSE: &str = "Empty response";

struct LifecycleStatus {
    state: ProviderState,
    health: HealthStatus,
    stats: ProviderStats,
    in_flight: usize,
}

/// A provider instance together with its health and statistics.
///
/// Health is a snapshot: nothing polls in the background, callers invoke
/// [`check_health`](Self::check_health) before dispatching.
pub struct ProviderLifecycle {
    name: String,
    provider: Arc<dyn Provider>,
    version: ProviderVersion,
    status: Mutex<LifecycleStatus>,
}

impl ProviderLifecycle {
    pub fn new(provider: Arc<dyn Provider>, version: ProviderVersion) -> Self {
        Self {
            name: provider.name().to_string(),
            provider,
            version,
            status: Mutex::new(LifecycleStatus {
                state: ProviderState::Initializing,
                health: HealthStatus::default(),
                stats: ProviderStats::default(),
                in_flight: 0,
            }),
        }
    }

    fn status(&self) -> MutexGuard<'_, LifecycleStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Accessors ====================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        Arc::clone(&self.provider)
    }

    pub fn version(&self) -> &ProviderVersion {
        &self.version
    }

    pub fn state(&self) -> ProviderState {
        self.status().state
    }

    pub fn health(&self) -> HealthStatus {
        self.status().health.clone()
    }

    pub fn stats(&self) -> ProviderStats {
        self.status().stats.clone()
    }

    /// Temperature of the wrapped provider's stored config
    pub fn temperature(&self) -> f64 {
        self.provider.config().temperature()
    }

    /// Current load estimate in requests per minute
    pub fn load(&self) -> f64 {
        self.status().stats.requests_per_minute
    }

    /// Force a state. `Shutdown` is terminal and is never left
    pub fn set_state(&self, state: ProviderState) {
        let mut status = self.status();
        if !status.state.is_terminal() {
            status.state = state;
        }
    }

    // ==================== Lifecycle ====================

    /// Validate the provider's config and become `Ready`.
    ///
    /// On failure the lifecycle moves to `Error`, records the cause and
    /// returns it.
    pub fn initialize(&self) -> Result<(), ProviderError> {
        if self.state().is_terminal() {
            return Err(ProviderError::Shutdown(self.name.clone()));
        }
        match self.provider.validate_config() {
            Ok(()) => {
                self.status().state = ProviderState::Ready;
                info!(provider = %self.name, version = %self.version.version(), "Provider ready");
                Ok(())
            }
            Err(e) => {
                let mut status = self.status();
                status.state = ProviderState::Error;
                status.health.is_healthy = false;
                status.health.last_error = Some(e.to_string());
                warn!(provider = %self.name, error = %e, "Provider initialization failed");
                Err(e)
            }
        }
    }

    /// Snapshot health check.
    ///
    /// Unhealthy when in `Error`/`Shutdown` or when the failure rate is
    /// above [`MAX_ERROR_RATE`](solver_domain::MAX_ERROR_RATE).
    pub fn check_health(&self) -> bool {
        let mut status = self.status();
        if matches!(status.state, ProviderState::Error | ProviderState::Shutdown) {
            status.health.is_healthy = false;
            return false;
        }
        if status.health.error_rate_exceeded() {
            status.health.is_healthy = false;
            status.health.last_error = Some(HIGH_ERROR_RATE.to_string());
            debug!(
                provider = %self.name,
                error_rate = status.health.error_rate(),
                "Provider unhealthy"
            );
            return false;
        }
        status.health.last_check = Some(Utc::now());
        status.health.is_healthy = true;
        true
    }

    /// Fold one request into health and usage statistics
    pub fn update_stats(&self, tokens: u64, cost: f64, success: bool, error: Option<&str>) {
        let mut status = self.status();
        status.health.total_requests += 1;
        if !success {
            status
                .health
                .record_failure(error.unwrap_or("unknown error"));
        }
        let total = status.health.total_requests;
        status.stats.record(tokens, cost, Utc::now(), total);
    }

    /// Reject empty or whitespace-only text, counting it as a failed request
    pub fn validate_response(&self, text: &str) -> Result<(), ProviderError> {
        if text.trim().is_empty() {
            self.update_stats(0, 0.0, false, Some(EMPTY_RESPONSE));
            warn!(provider = %self.name, "Provider returned empty response");
            return Err(ProviderError::EmptyResponse);
        }
        Ok(())
    }

    /// Move to `Shutdown`. Returns false if already shut down.
    pub fn cleanup(&self) -> bool {
        let mut status = self.status();
        if status.state.is_terminal() {
            return false;
        }
        status.state = ProviderState::Shutdown;
        info!(provider = %self.name, "Provider shut down");
        true
    }

    // ==================== Dispatch ====================

    /// Count one more request in flight; the first one moves `Ready` to `Busy`
    fn begin_dispatch(&self) -> Result<DispatchGuard<'_>, ProviderError> {
        let mut status = self.status();
        if status.state == ProviderState::Shutdown {
            return Err(ProviderError::Shutdown(self.name.clone()));
        }
        status.in_flight += 1;
        if status.state == ProviderState::Ready {
            status.state = ProviderState::Busy;
        }
        Ok(DispatchGuard { lifecycle: self })
    }

    fn end_dispatch(&self) {
        let mut status = self.status();
        status.in_flight = status.in_flight.saturating_sub(1);
        if status.in_flight == 0 && status.state == ProviderState::Busy {
            status.state = ProviderState::Ready;
        }
    }

    /// Requests dispatched and not yet finished
    pub fn in_flight(&self) -> usize {
        self.status().in_flight
    }

    /// Generate through the wrapped provider, validating the response and
    /// recording the request.
    pub async fn generate(
        &self,
        prompt: &str,
        overrides: GenerationOverrides,
    ) -> Result<String, ProviderError> {
        let dispatch = self.begin_dispatch()?;
        let result = self.provider.generate(prompt, overrides).await;
        drop(dispatch);

        match result {
            Ok(text) => {
                self.finish_response(&text).await?;
                Ok(text)
            }
            Err(e) => {
                self.update_stats(0, 0.0, false, Some(&e.to_string()));
                Err(e)
            }
        }
    }

    /// Stream through the wrapped provider, handing each chunk to
    /// `on_chunk`, and return the full text.
    ///
    /// The request stays in flight until the stream is exhausted. Failing
    /// to open it, an error mid-stream and an empty result each count as
    /// one failed request. Dropping the future mid-stream records nothing.
    pub async fn generate_stream(
        &self,
        prompt: &str,
        overrides: GenerationOverrides,
        on_chunk: impl FnMut(&str),
    ) -> Result<String, ProviderError> {
        let dispatch = self.begin_dispatch()?;
        let result = match self.provider.generate_stream(prompt, overrides).await {
            Ok(stream) => stream.collect_text(on_chunk).await,
            Err(e) => Err(e),
        };
        drop(dispatch);

        match result {
            Ok(text) => {
                self.finish_response(&text).await?;
                Ok(text)
            }
            Err(e) => {
                warn!(provider = %self.name, error = %e, "Stream failed");
                self.update_stats(0, 0.0, false, Some(&e.to_string()));
                Err(e)
            }
        }
    }

    /// Validate a finished response and record it as a successful request
    async fn finish_response(&self, text: &str) -> Result<(), ProviderError> {
        self.validate_response(text)?;
        let tokens = match self.provider.count_tokens(text).await {
            Ok(n) => n,
            Err(e) => {
                debug!(provider = %self.name, error = %e, "Token count unavailable");
                0
            }
        };
        self.update_stats(tokens, 0.0, true, None);
        Ok(())
    }
}

/// Ends a dispatch when dropped, including when the request is cancelled
struct DispatchGuard<'a> {
    lifecycle: &'a ProviderLifecycle,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.end_dispatch();
    }
}

impl std::fmt::Debug for ProviderLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderLifecycle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::generation::TextStream;
    use async_trait::async_trait;
    use futures::StreamExt;
    use serde_json::{Map, Value};
    use solver_domain::{GenerationConfig, ModelVersion, Version};
    use std::collections::VecDeque;

    // ==================== Test Mocks ====================

    /// Provider double with scripted responses
    pub(crate) struct MockProvider {
        name: String,
        config: Mutex<GenerationConfig>,
        responses: Mutex<VecDeque<Result<String, ProviderError>>>,
        broken_streams: Mutex<VecDeque<ProviderError>>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl MockProvider {
        pub(crate) fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                config: Mutex::new(GenerationConfig::default()),
                responses: Mutex::new(VecDeque::new()),
                broken_streams: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with_responses(self, responses: Vec<Result<String, ProviderError>>) -> Self {
            *self.responses.lock().unwrap() = VecDeque::from(responses);
            self
        }

        /// The next stream opens, yields one chunk, then fails with `error`
        pub(crate) fn with_broken_stream(self, error: ProviderError) -> Self {
            self.broken_streams.lock().unwrap().push_back(error);
            self
        }

        pub(crate) fn with_temperature(self, temperature: f64) -> Self {
            let config = GenerationConfig::default()
                .with_temperature(temperature)
                .unwrap();
            *self.config.lock().unwrap() = config;
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn generate(
            &self,
            prompt: &str,
            _overrides: GenerationOverrides,
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(format!("response from {}", self.name)))
        }

        async fn generate_stream(
            &self,
            prompt: &str,
            overrides: GenerationOverrides,
        ) -> Result<TextStream<ProviderError>, ProviderError> {
            let broken = self.broken_streams.lock().unwrap().pop_front();
            if let Some(error) = broken {
                self.calls.lock().unwrap().push(prompt.to_string());
                let items = vec![Ok("partial ".to_string()), Err(error)];
                return Ok(TextStream::new(futures::stream::iter(items).boxed()));
            }
            let text = self.generate(prompt, overrides).await?;
            let chunks = text.split_inclusive(' ').map(String::from).collect();
            Ok(TextStream::from_chunks(chunks))
        }

        async fn count_tokens(&self, text: &str) -> Result<u64, ProviderError> {
            Ok(text.split_whitespace().count() as u64)
        }

        fn config(&self) -> GenerationConfig {
            self.config.lock().unwrap().clone()
        }

        fn update_config(&self, changes: &Map<String, Value>) -> Result<(), ProviderError> {
            self.config.lock().unwrap().update(changes)?;
            Ok(())
        }
    }

    /// Descriptor whose default model has exactly `capabilities`
    pub(crate) fn version_with(name: &str, capabilities: &[&str]) -> ProviderVersion {
        let model = ModelVersion::new(
            format!("{name}-model"),
            Version::new(1, 0, 0),
            capabilities.iter().copied(),
        );
        ProviderVersion::new(name, Version::new(1, 0, 0), [model], format!("{name}-model"))
            .unwrap()
    }

    pub(crate) fn ready_lifecycle(provider: MockProvider, capabilities: &[&str]) -> Arc<ProviderLifecycle> {
        let version = version_with(provider.name.as_str(), capabilities);
        let lifecycle = Arc::new(ProviderLifecycle::new(Arc::new(provider), version));
        lifecycle.initialize().unwrap();
        lifecycle
    }

    #[test]
    fn test_initialize_moves_to_ready() {
        let lifecycle =
            ProviderLifecycle::new(Arc::new(MockProvider::new("p")), version_with("p", &["chat"]));
        assert_eq!(lifecycle.state(), ProviderState::Initializing);
        lifecycle.initialize().unwrap();
        assert_eq!(lifecycle.state(), ProviderState::Ready);
    }

    #[test]
    fn test_error_rate_threshold() {
        let lifecycle = ready_lifecycle(MockProvider::new("p"), &["chat"]);
        for i in 0..10 {
            lifecycle.update_stats(10, 0.0, i >= 2, Some("boom"));
        }
        assert!(lifecycle.check_health(), "2/10 failures is still healthy");

        let lifecycle = ready_lifecycle(MockProvider::new("p"), &["chat"]);
        for i in 0..10 {
            lifecycle.update_stats(10, 0.0, i >= 3, Some("boom"));
        }
        assert!(!lifecycle.check_health(), "3/10 failures is unhealthy");
        assert_eq!(lifecycle.health().last_error.as_deref(), Some("High error rate"));
    }

    #[test]
    fn test_error_state_is_unhealthy() {
        let lifecycle = ready_lifecycle(MockProvider::new("p"), &["chat"]);
        lifecycle.set_state(ProviderState::Error);
        assert!(!lifecycle.check_health());
    }

    #[test]
    fn test_check_health_refreshes_last_check() {
        let lifecycle = ready_lifecycle(MockProvider::new("p"), &["chat"]);
        assert!(lifecycle.health().last_check.is_none());
        assert!(lifecycle.check_health());
        assert!(lifecycle.health().last_check.is_some());
    }

    #[test]
    fn test_validate_response_counts_failure() {
        let lifecycle = ready_lifecycle(MockProvider::new("p"), &["chat"]);
        assert_eq!(
            lifecycle.validate_response(" \n\t"),
            Err(ProviderError::EmptyResponse)
        );
        let health = lifecycle.health();
        assert_eq!(health.total_requests, 1);
        assert_eq!(health.failed_requests, 1);
        assert_eq!(health.last_error.as_deref(), Some("Empty response"));
        assert!(lifecycle.validate_response("ok").is_ok());
    }

    #[tokio::test]
    async fn test_generate_records_stats_and_returns_to_ready() {
        let provider = MockProvider::new("p").with_responses(vec![Ok("two words".into())]);
        let lifecycle = ready_lifecycle(provider, &["chat"]);

        let text = lifecycle
            .generate("hi", GenerationOverrides::none())
            .await
            .unwrap();

        assert_eq!(text, "two words");
        assert_eq!(lifecycle.state(), ProviderState::Ready);
        assert_eq!(lifecycle.stats().total_tokens, 2);
        assert_eq!(lifecycle.health().total_requests, 1);
        assert_eq!(lifecycle.health().failed_requests, 0);
    }

    #[tokio::test]
    async fn test_generate_empty_response_is_a_failure() {
        let provider = MockProvider::new("p").with_responses(vec![Ok("".into())]);
        let lifecycle = ready_lifecycle(provider, &["chat"]);

        let result = lifecycle.generate("hi", GenerationOverrides::none()).await;

        assert_eq!(result, Err(ProviderError::EmptyResponse));
        assert_eq!(lifecycle.health().failed_requests, 1);
        assert_eq!(lifecycle.health().total_requests, 1);
    }

    #[tokio::test]
    async fn test_stream_stays_busy_until_exhausted() {
        let provider = MockProvider::new("p").with_responses(vec![Ok("three word answer".into())]);
        let lifecycle = ready_lifecycle(provider, &["chat"]);
        let mut observed = Vec::new();

        let text = lifecycle
            .generate_stream("hi", GenerationOverrides::none(), |_| {
                observed.push((lifecycle.state(), lifecycle.in_flight()));
            })
            .await
            .unwrap();

        assert_eq!(text, "three word answer");
        assert_eq!(observed.len(), 3);
        assert!(observed.iter().all(|o| *o == (ProviderState::Busy, 1)));
        assert_eq!(lifecycle.state(), ProviderState::Ready);
        assert_eq!(lifecycle.in_flight(), 0);
        assert_eq!(lifecycle.health().total_requests, 1);
        assert_eq!(lifecycle.stats().total_tokens, 3);
    }

    #[tokio::test]
    async fn test_mid_stream_error_counts_as_failed_request() {
        let provider = MockProvider::new("p")
            .with_broken_stream(ProviderError::Request("connection reset".into()));
        let lifecycle = ready_lifecycle(provider, &["chat"]);
        let mut chunks = Vec::new();

        let result = lifecycle
            .generate_stream("hi", GenerationOverrides::none(), |c| chunks.push(c.to_string()))
            .await;

        assert_eq!(result, Err(ProviderError::Request("connection reset".into())));
        assert_eq!(chunks, vec!["partial "]);
        let health = lifecycle.health();
        assert_eq!(health.total_requests, 1);
        assert_eq!(health.failed_requests, 1);
        assert!(health.last_error.unwrap().contains("connection reset"));
        assert_eq!(lifecycle.state(), ProviderState::Ready);
        assert_eq!(lifecycle.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_stream_open_failure_counts_as_failed_request() {
        let provider = MockProvider::new("p")
            .with_responses(vec![Err(ProviderError::RateLimited("429".into()))]);
        let lifecycle = ready_lifecycle(provider, &["chat"]);

        let result = lifecycle
            .generate_stream("hi", GenerationOverrides::none(), |_| {})
            .await;

        assert!(matches!(result, Err(ProviderError::RateLimited(_))));
        assert_eq!(lifecycle.health().failed_requests, 1);
        assert_eq!(lifecycle.state(), ProviderState::Ready);
    }

    #[tokio::test]
    async fn test_overlapping_requests_keep_busy_until_last_finishes() {
        struct GatedProvider {
            gate: tokio::sync::Semaphore,
        }

        #[async_trait]
        impl Provider for GatedProvider {
            fn name(&self) -> &str {
                "gated"
            }
            async fn generate(&self, _: &str, _: GenerationOverrides) -> Result<String, ProviderError> {
                self.gate.acquire().await.unwrap().forget();
                Ok("done".into())
            }
            async fn generate_stream(
                &self,
                _: &str,
                _: GenerationOverrides,
            ) -> Result<TextStream<ProviderError>, ProviderError> {
                unreachable!()
            }
            async fn count_tokens(&self, _: &str) -> Result<u64, ProviderError> {
                Ok(1)
            }
            fn config(&self) -> GenerationConfig {
                GenerationConfig::default()
            }
            fn update_config(&self, _: &Map<String, Value>) -> Result<(), ProviderError> {
                Ok(())
            }
        }

        let provider = Arc::new(GatedProvider {
            gate: tokio::sync::Semaphore::new(0),
        });
        let lifecycle = Arc::new(ProviderLifecycle::new(
            provider.clone(),
            version_with("gated", &["chat"]),
        ));
        lifecycle.initialize().unwrap();

        let spawn = |lifecycle: Arc<ProviderLifecycle>| {
            tokio::spawn(async move { lifecycle.generate("q", GenerationOverrides::none()).await })
        };
        let first = spawn(lifecycle.clone());
        let second = spawn(lifecycle.clone());
        while lifecycle.in_flight() < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(lifecycle.state(), ProviderState::Busy);

        provider.gate.add_permits(1);
        while lifecycle.in_flight() > 1 {
            tokio::task::yield_now().await;
        }
        assert_eq!(lifecycle.state(), ProviderState::Busy);

        provider.gate.add_permits(1);
        assert_eq!(first.await.unwrap().unwrap(), "done");
        assert_eq!(second.await.unwrap().unwrap(), "done");
        assert_eq!(lifecycle.state(), ProviderState::Ready);
        assert_eq!(lifecycle.in_flight(), 0);
        assert_eq!(lifecycle.health().total_requests, 2);
    }

    #[tokio::test]
    async fn test_shutdown_is_terminal() {
        let provider = MockProvider::new("p");
        let lifecycle = ready_lifecycle(provider, &["chat"]);

        assert!(lifecycle.cleanup());
        assert!(!lifecycle.cleanup());
        lifecycle.set_state(ProviderState::Ready);
        assert_eq!(lifecycle.state(), ProviderState::Shutdown);

        let result = lifecycle.generate("hi", GenerationOverrides::none()).await;
        assert!(matches!(result, Err(ProviderError::Shutdown(_))));
        assert!(lifecycle.initialize().is_err());
        assert!(!lifecycle.check_health());
    }

    #[test]
    fn test_initialize_failure_sets_error() {
        struct BrokenConfig;

        #[async_trait]
        impl Provider for BrokenConfig {
            fn name(&self) -> &str {
                "broken"
            }
            async fn generate(&self, _: &str, _: GenerationOverrides) -> Result<String, ProviderError> {
                unreachable!()
            }
            async fn generate_stream(
                &self,
                _: &str,
                _: GenerationOverrides,
            ) -> Result<TextStream<ProviderError>, ProviderError> {
                unreachable!()
            }
            async fn count_tokens(&self, _: &str) -> Result<u64, ProviderError> {
                Ok(0)
            }
            fn config(&self) -> GenerationConfig {
                GenerationConfig::default()
            }
            fn update_config(&self, _: &Map<String, Value>) -> Result<(), ProviderError> {
                Ok(())
            }
            fn validate_config(&self) -> Result<(), ProviderError> {
                Err(solver_domain::DomainError::config("missing model").into())
            }
        }

        let lifecycle = ProviderLifecycle::new(Arc::new(BrokenConfig), version_with("broken", &[]));
        assert!(lifecycle.initialize().is_err());
        assert_eq!(lifecycle.state(), ProviderState::Error);
        assert!(lifecycle.health().last_error.is_some());
        assert!(!lifecycle.check_health());
    }
}
