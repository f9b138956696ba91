//! Capability-aware provider selection and the fallback chain

use super::error::RegistryError;
use super::lifecycle::ProviderLifecycle;
use solver_domain::{ProviderCapability, ProviderState};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Allowed distance between a requested and a configured temperature
pub const TEMPERATURE_TOLERANCE: f64 = 0.1;

// Absorbs float noise such as 0.8 - 0.7 > 0.1
const TOLERANCE_EPSILON: f64 = 1e-9;

/// Chooses among instantiated providers.
///
/// Candidates are kept in instantiation order, which is also the tie-break
/// order when ranking. `known` holds every registered name, instantiated
/// or not, and is what fallback chains are validated against.
#[derive(Debug, Default)]
pub struct ProviderSelector {
    known: BTreeSet<String>,
    providers: Vec<Arc<ProviderLifecycle>>,
    fallback_chain: Vec<String>,
    cursor: usize,
    load: HashMap<String, f64>,
}

impl ProviderSelector {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Candidates ====================

    pub fn register_name(&mut self, name: &str) {
        self.known.insert(name.to_string());
    }

    /// Add a candidate, replacing any existing one with the same name
    pub fn add_provider(&mut self, lifecycle: Arc<ProviderLifecycle>) {
        self.known.insert(lifecycle.name().to_string());
        match self
            .providers
            .iter_mut()
            .find(|p| p.name() == lifecycle.name())
        {
            Some(slot) => *slot = lifecycle,
            None => self.providers.push(lifecycle),
        }
    }

    pub fn remove_provider(&mut self, name: &str) -> Option<Arc<ProviderLifecycle>> {
        let index = self.providers.iter().position(|p| p.name() == name)?;
        self.load.remove(name);
        Some(self.providers.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<Arc<ProviderLifecycle>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    pub fn providers(&self) -> &[Arc<ProviderLifecycle>] {
        &self.providers
    }

    // ==================== Selection ====================

    /// Pick the best `Ready` provider offering every required capability
    /// and, if requested, a temperature within the tolerance.
    ///
    /// Ranking: healthy first, then fewer errors, then lower load.
    pub fn select_provider(
        &self,
        capabilities: &[ProviderCapability],
        temperature: Option<f64>,
    ) -> Result<Arc<ProviderLifecycle>, RegistryError> {
        let mut candidates: Vec<&Arc<ProviderLifecycle>> = self
            .providers
            .iter()
            .filter(|p| p.state() == ProviderState::Ready)
            .filter(|p| satisfies(p, capabilities))
            .collect();

        if candidates.is_empty() {
            let names: Vec<&str> = capabilities
                .iter()
                .filter(|c| c.required)
                .map(|c| c.name.as_str())
                .collect();
            return Err(RegistryError::Config(format!(
                "No provider found with required capabilities: [{}]",
                names.join(", ")
            )));
        }

        if let Some(requested) = temperature {
            if !(0.0..=1.0).contains(&requested) {
                return Err(RegistryError::Temperature(format!(
                    "Requested temperature {} is outside [0, 1]",
                    requested
                )));
            }
            candidates.retain(|p| {
                (p.temperature() - requested).abs() <= TEMPERATURE_TOLERANCE + TOLERANCE_EPSILON
            });
            if candidates.is_empty() {
                return Err(RegistryError::Temperature(format!(
                    "No provider configured within ±{} of temperature {}",
                    TEMPERATURE_TOLERANCE, requested
                )));
            }
        }

        let mut ranked: Vec<(&Arc<ProviderLifecycle>, bool, u64, f64)> = candidates
            .into_iter()
            .map(|p| {
                let health = p.health();
                let load = self.load.get(p.name()).copied().unwrap_or_else(|| p.load());
                (p, health.is_healthy, health.error_count, load)
            })
            .collect();

        // Stable sort keeps instantiation order for ties
        ranked.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(a.2.cmp(&b.2))
                .then(a.3.partial_cmp(&b.3).unwrap_or(Ordering::Equal))
        });

        let (chosen, ..) = ranked[0];
        debug!(provider = chosen.name(), "Selected provider");
        Ok(Arc::clone(chosen))
    }

    /// Record the current load of a provider for later ranking
    pub fn update_load_distribution(&mut self, lifecycle: &ProviderLifecycle) {
        self.load
            .insert(lifecycle.name().to_string(), lifecycle.stats().requests_per_minute);
    }

    pub fn load_of(&self, name: &str) -> Option<f64> {
        self.load.get(name).copied()
    }

    // ==================== Fallback Chain ====================

    /// Replace the chain and rewind. Every name must be registered.
    pub fn set_fallback_chain(&mut self, chain: Vec<String>) -> Result<(), RegistryError> {
        if let Some(unknown) = chain.iter().find(|name| !self.known.contains(name.as_str())) {
            return Err(RegistryError::Config(format!(
                "Unknown provider in fallback chain: {}",
                unknown
            )));
        }
        info!(chain = ?chain, "Fallback chain set");
        self.fallback_chain = chain;
        self.cursor = 0;
        Ok(())
    }

    pub fn fallback_chain(&self) -> &[String] {
        &self.fallback_chain
    }

    pub fn reset_fallback_chain(&mut self) {
        self.cursor = 0;
    }

    /// Next viable provider in the chain.
    ///
    /// Skips providers that are not `Ready` or fail their health check and
    /// leaves the cursor just past the one returned. Running off the end
    /// rewinds the cursor and fails.
    pub fn get_fallback_provider(&mut self) -> Result<Arc<ProviderLifecycle>, RegistryError> {
        while self.cursor < self.fallback_chain.len() {
            let name = &self.fallback_chain[self.cursor];
            self.cursor += 1;

            let Some(candidate) = self.get(name) else {
                debug!(provider = %name, "Fallback provider not instantiated");
                continue;
            };
            if candidate.state() == ProviderState::Ready && candidate.check_health() {
                info!(provider = %name, "Using fallback provider");
                return Ok(candidate);
            }
            debug!(provider = %name, state = %candidate.state(), "Skipping fallback provider");
        }
        self.cursor = 0;
        Err(RegistryError::Retry(
            "All fallback providers exhausted".to_string(),
        ))
    }
}

fn satisfies(lifecycle: &ProviderLifecycle, capabilities: &[ProviderCapability]) -> bool {
    let version = lifecycle.version();
    capabilities.iter().filter(|c| c.required).all(|c| {
        version.supports_capability(&c.name, None)
            && c.min_version.is_none_or(|min| version.version() >= min)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::lifecycle::tests::{MockProvider, ready_lifecycle};
    use solver_domain::Version;

    fn caps(names: &[&str]) -> Vec<ProviderCapability> {
        names.iter().map(|n| ProviderCapability::required(*n)).collect()
    }

    fn selector_with(lifecycles: Vec<Arc<ProviderLifecycle>>) -> ProviderSelector {
        let mut selector = ProviderSelector::new();
        for lifecycle in lifecycles {
            selector.add_provider(lifecycle);
        }
        selector
    }

    #[test]
    fn test_selects_by_capability() {
        let selector = selector_with(vec![
            ready_lifecycle(MockProvider::new("coder"), &["text", "code"]),
            ready_lifecycle(MockProvider::new("chatter"), &["text", "chat"]),
        ]);

        let chosen = selector
            .select_provider(&caps(&["text", "chat"]), None)
            .unwrap();
        assert_eq!(chosen.name(), "chatter");

        let err = selector.select_provider(&caps(&["image"]), None).unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));
    }

    #[test]
    fn test_optional_capabilities_do_not_filter() {
        let selector = selector_with(vec![ready_lifecycle(MockProvider::new("p"), &["text"])]);
        let wanted = vec![
            ProviderCapability::required("text"),
            ProviderCapability::optional("image"),
        ];
        assert!(selector.select_provider(&wanted, None).is_ok());
    }

    #[test]
    fn test_min_version_filters() {
        let selector = selector_with(vec![ready_lifecycle(MockProvider::new("p"), &["text"])]);
        let wanted = vec![ProviderCapability::required("text").with_min_version(Version::new(2, 0, 0))];
        assert!(selector.select_provider(&wanted, None).is_err());
    }

    #[test]
    fn test_only_ready_providers_are_candidates() {
        let busy = ready_lifecycle(MockProvider::new("busy"), &["text"]);
        busy.set_state(ProviderState::Busy);
        let selector = selector_with(vec![busy]);
        assert!(selector.select_provider(&caps(&["text"]), None).is_err());
    }

    #[test]
    fn test_temperature_filter() {
        let selector = selector_with(vec![
            ready_lifecycle(MockProvider::new("cold").with_temperature(0.2), &["text"]),
            ready_lifecycle(MockProvider::new("warm").with_temperature(0.7), &["text"]),
        ]);

        let chosen = selector
            .select_provider(&caps(&["text"]), Some(0.8))
            .unwrap();
        assert_eq!(chosen.name(), "warm");

        assert!(matches!(
            selector.select_provider(&caps(&["text"]), Some(0.45)),
            Err(RegistryError::Temperature(_))
        ));
        assert!(matches!(
            selector.select_provider(&caps(&["text"]), Some(1.5)),
            Err(RegistryError::Temperature(_))
        ));
    }

    #[test]
    fn test_ranking_prefers_fewer_errors_then_order() {
        let flaky = ready_lifecycle(MockProvider::new("flaky"), &["text"]);
        flaky.update_stats(0, 0.0, false, Some("boom"));
        for _ in 0..9 {
            flaky.update_stats(0, 0.0, true, None);
        }
        let first = ready_lifecycle(MockProvider::new("first"), &["text"]);
        let second = ready_lifecycle(MockProvider::new("second"), &["text"]);
        let selector = selector_with(vec![flaky, first, second]);

        let chosen = selector.select_provider(&caps(&["text"]), None).unwrap();
        assert_eq!(chosen.name(), "first");
    }

    #[test]
    fn test_ranking_prefers_healthy() {
        let sick = ready_lifecycle(MockProvider::new("sick"), &["text"]);
        for _ in 0..5 {
            sick.update_stats(0, 0.0, false, Some("boom"));
        }
        assert!(!sick.check_health());
        let fine = ready_lifecycle(MockProvider::new("fine"), &["text"]);
        let selector = selector_with(vec![sick, fine]);

        let chosen = selector.select_provider(&caps(&["text"]), None).unwrap();
        assert_eq!(chosen.name(), "fine");
    }

    #[test]
    fn test_ranking_prefers_lower_load() {
        let hot = ready_lifecycle(MockProvider::new("hot"), &["text"]);
        let cool = ready_lifecycle(MockProvider::new("cool"), &["text"]);
        let mut selector = selector_with(vec![hot, cool]);
        selector.load.insert("hot".into(), 30.0);
        selector.load.insert("cool".into(), 5.0);

        let chosen = selector.select_provider(&caps(&["text"]), None).unwrap();
        assert_eq!(chosen.name(), "cool");
    }

    #[test]
    fn test_fallback_skips_error_and_exhausts() {
        let p1 = ready_lifecycle(MockProvider::new("p1"), &["text"]);
        let p2 = ready_lifecycle(MockProvider::new("p2"), &["text"]);
        p1.set_state(ProviderState::Error);
        let mut selector = selector_with(vec![p1, p2.clone()]);
        selector
            .set_fallback_chain(vec!["p1".into(), "p2".into()])
            .unwrap();

        assert_eq!(selector.get_fallback_provider().unwrap().name(), "p2");

        p2.set_state(ProviderState::Error);
        assert!(matches!(
            selector.get_fallback_provider(),
            Err(RegistryError::Retry(_))
        ));
        assert_eq!(selector.cursor, 0);
    }

    #[test]
    fn test_fallback_advances_through_chain() {
        let mut selector = selector_with(vec![
            ready_lifecycle(MockProvider::new("a"), &["text"]),
            ready_lifecycle(MockProvider::new("b"), &["text"]),
        ]);
        selector
            .set_fallback_chain(vec!["a".into(), "b".into()])
            .unwrap();

        assert_eq!(selector.get_fallback_provider().unwrap().name(), "a");
        assert_eq!(selector.get_fallback_provider().unwrap().name(), "b");
        assert!(selector.get_fallback_provider().is_err());
        // Cursor rewound after exhaustion
        assert_eq!(selector.get_fallback_provider().unwrap().name(), "a");

        selector.reset_fallback_chain();
        assert_eq!(selector.get_fallback_provider().unwrap().name(), "a");
    }

    #[test]
    fn test_set_fallback_chain_rejects_unknown() {
        let mut selector = selector_with(vec![ready_lifecycle(MockProvider::new("a"), &["text"])]);
        let err = selector
            .set_fallback_chain(vec!["a".into(), "ghost".into()])
            .unwrap_err();
        assert!(matches!(err, RegistryError::Config(msg) if msg.contains("ghost")));
        assert!(selector.fallback_chain().is_empty());
    }

    #[test]
    fn test_remove_provider() {
        let mut selector = selector_with(vec![ready_lifecycle(MockProvider::new("x"), &["text"])]);
        assert!(selector.remove_provider("x").is_some());
        assert!(selector.get("x").is_none());
        assert!(selector.remove_provider("x").is_none());
    }
}
