//! Provider registry
//!
//! Maps provider names to constructors and capability descriptors, caches
//! instantiated [`ProviderLifecycle`]s and tracks the active provider. The
//! registry is an ordinary value: build one, wrap it in an `Arc`, and hand
//! it to whoever needs it.

use super::error::RegistryError;
use super::lifecycle::ProviderLifecycle;
use super::selector::ProviderSelector;
use crate::ports::provider::{Provider, ProviderError};
use solver_domain::{ProviderCapability, ProviderVersion};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Builds a provider. `None` means "resolve credentials from the
/// environment".
pub type ProviderConstructor =
    Arc<dyn Fn(Option<String>) -> Result<Arc<dyn Provider>, ProviderError> + Send + Sync>;

struct Registration {
    constructor: ProviderConstructor,
    version: ProviderVersion,
}

#[derive(Default)]
struct RegistryInner {
    registrations: BTreeMap<String, Registration>,
    selector: ProviderSelector,
    active: Option<String>,
}

/// Which provider [`ProviderRegistry::set_provider`] should activate
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    /// Activate this provider by name; otherwise let the selector choose
    pub name: Option<String>,
    pub capabilities: Vec<ProviderCapability>,
    pub temperature: Option<f64>,
}

impl ProviderRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<ProviderCapability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Registry of providers and the active-provider pointer.
///
/// Registration, activation and cleanup take the write lock; lookups take
/// the read lock.
#[derive(Default)]
pub struct ProviderRegistry {
    inner: RwLock<RegistryInner>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Registration ====================

    /// Register a constructor under `name`.
    ///
    /// Rejects duplicate names and descriptors whose default model is not
    /// among their supported models.
    pub fn register_provider(
        &self,
        name: impl Into<String>,
        version: ProviderVersion,
        constructor: ProviderConstructor,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut inner = self.write();

        if inner.registrations.contains_key(&name) {
            return Err(RegistryError::Config(format!(
                "Provider already registered: {}",
                name
            )));
        }
        if let Err(e) = version.get_model(None) {
            return Err(RegistryError::InvalidModel(format!(
                "Provider '{}' has a non-conforming descriptor: {}",
                name, e
            )));
        }

        debug!(provider = %name, version = %version.version(), "Registered provider");
        inner.selector.register_name(&name);
        inner.registrations.insert(
            name,
            Registration {
                constructor,
                version,
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.read().registrations.contains_key(name)
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.read().registrations.keys().cloned().collect()
    }

    pub fn version_of(&self, name: &str) -> Option<ProviderVersion> {
        self.read()
            .registrations
            .get(name)
            .map(|r| r.version.clone())
    }

    // ==================== Construction ====================

    /// Build a provider without touching the registry's state
    pub fn create_provider(
        &self,
        name: &str,
        api_key: Option<String>,
    ) -> Result<Arc<dyn Provider>, RegistryError> {
        let constructor = self
            .read()
            .registrations
            .get(name)
            .map(|r| Arc::clone(&r.constructor))
            .ok_or_else(|| RegistryError::Config(format!("Unknown provider: {}", name)))?;
        Ok(constructor(api_key)?)
    }

    /// Construct, initialize and cache a lifecycle for `name`
    fn instantiate(
        inner: &mut RegistryInner,
        name: &str,
    ) -> Result<Arc<ProviderLifecycle>, RegistryError> {
        let registration = inner
            .registrations
            .get(name)
            .ok_or_else(|| RegistryError::Config(format!("Unknown provider: {}", name)))?;

        let provider = (registration.constructor)(None)?;
        if provider.name() != name {
            return Err(RegistryError::Config(format!(
                "Constructor for '{}' produced provider '{}'",
                name,
                provider.name()
            )));
        }

        let lifecycle = Arc::new(ProviderLifecycle::new(
            provider,
            registration.version.clone(),
        ));
        lifecycle.initialize()?;
        inner.selector.add_provider(Arc::clone(&lifecycle));
        Ok(lifecycle)
    }

    // ==================== Active Provider ====================

    /// Resolve a provider per `request` and make it the active one.
    ///
    /// A named provider is reused if cached, otherwise constructed with
    /// environment credentials and initialized. Without a name the selector
    /// decides. The chosen provider must pass a health check.
    pub fn set_provider(
        &self,
        request: ProviderRequest,
    ) -> Result<Arc<ProviderLifecycle>, RegistryError> {
        let mut inner = self.write();

        let lifecycle = match &request.name {
            Some(name) => match inner.selector.get(name) {
                Some(existing) => existing,
                None => Self::instantiate(&mut inner, name)?,
            },
            None => inner
                .selector
                .select_provider(&request.capabilities, request.temperature)?,
        };

        if !lifecycle.check_health() {
            let reason = lifecycle
                .health()
                .last_error
                .unwrap_or_else(|| lifecycle.state().to_string());
            warn!(provider = lifecycle.name(), reason = %reason, "Provider failed health check");
            return Err(RegistryError::EmptyResponse(format!(
                "Provider '{}' failed health check: {}",
                lifecycle.name(),
                reason
            )));
        }

        inner.active = Some(lifecycle.name().to_string());
        inner.selector.update_load_distribution(&lifecycle);
        info!(provider = lifecycle.name(), "Active provider set");
        Ok(lifecycle)
    }

    pub fn active_provider(&self) -> Option<Arc<ProviderLifecycle>> {
        let inner = self.read();
        inner
            .active
            .as_deref()
            .and_then(|name| inner.selector.get(name))
    }

    pub fn active_name(&self) -> Option<String> {
        self.read().active.clone()
    }

    pub fn get_provider(&self, name: &str) -> Option<Arc<ProviderLifecycle>> {
        self.read().selector.get(name)
    }

    /// Refresh the recorded load of a cached provider
    pub fn update_load(&self, lifecycle: &ProviderLifecycle) {
        self.write().selector.update_load_distribution(lifecycle);
    }

    // ==================== Cleanup ====================

    /// Shut down a cached provider and forget it.
    ///
    /// Unknown names, and names already cleaned up, are `ProviderNotFound`.
    pub fn cleanup_provider(&self, name: &str) -> Result<(), RegistryError> {
        let mut inner = self.write();
        let lifecycle = inner
            .selector
            .remove_provider(name)
            .ok_or_else(|| RegistryError::ProviderNotFound(name.to_string()))?;
        lifecycle.cleanup();
        if inner.active.as_deref() == Some(name) {
            inner.active = None;
        }
        info!(provider = %name, "Provider cleaned up");
        Ok(())
    }

    /// Clean up every cached provider
    pub fn shutdown(&self) {
        let names: Vec<String> = self
            .read()
            .selector
            .providers()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        for name in names {
            // Concurrent cleanup may have won the race; nothing left to do then
            let _ = self.cleanup_provider(&name);
        }
    }

    // ==================== Fallback ====================

    /// Set the fallback chain. Registered but not yet instantiated
    /// providers are instantiated now; one that fails to come up stays in
    /// the chain and is skipped when walked.
    pub fn set_fallback_chain(&self, chain: Vec<String>) -> Result<(), RegistryError> {
        let mut inner = self.write();
        if let Some(unknown) = chain
            .iter()
            .find(|name| !inner.registrations.contains_key(name.as_str()))
        {
            return Err(RegistryError::Config(format!(
                "Unknown provider in fallback chain: {}",
                unknown
            )));
        }

        for name in &chain {
            if inner.selector.get(name).is_some() {
                continue;
            }
            if let Err(e) = Self::instantiate(&mut inner, name) {
                warn!(provider = %name, error = %e, "Fallback provider unavailable");
            }
        }
        inner.selector.set_fallback_chain(chain)
    }

    pub fn fallback_chain(&self) -> Vec<String> {
        self.read().selector.fallback_chain().to_vec()
    }

    pub fn reset_fallback_chain(&self) {
        self.write().selector.reset_fallback_chain();
    }

    /// Next viable provider from the fallback chain, without activating it
    pub fn fallback_provider(&self) -> Result<Arc<ProviderLifecycle>, RegistryError> {
        self.write().selector.get_fallback_provider()
    }

    /// Switch the active provider to the next viable fallback
    pub fn activate_fallback(&self) -> Result<Arc<ProviderLifecycle>, RegistryError> {
        let mut inner = self.write();
        let lifecycle = inner.selector.get_fallback_provider()?;
        inner.active = Some(lifecycle.name().to_string());
        inner.selector.update_load_distribution(&lifecycle);
        Ok(lifecycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::lifecycle::tests::{MockProvider, version_with};
    use solver_domain::{DomainError, ModelVersion, ProviderState, Version};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn constructor(name: &'static str) -> ProviderConstructor {
        Arc::new(move |_api_key: Option<String>| Ok(Arc::new(MockProvider::new(name)) as Arc<dyn Provider>))
    }

    fn registry_with(names: &[&'static str]) -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        for name in names {
            registry
                .register_provider(*name, version_with(name, &["text", "chat"]), constructor(name))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = registry_with(&["gemini"]);
        let err = registry
            .register_provider("gemini", version_with("gemini", &[]), constructor("gemini"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));
    }

    #[test]
    fn test_non_conforming_descriptor_rejected() {
        let mut json = serde_json::to_value(version_with("odd", &["text"])).unwrap();
        json["default_model"] = serde_json::Value::from("missing-model");
        let broken: ProviderVersion = serde_json::from_value(json).unwrap();

        let registry = ProviderRegistry::new();
        let err = registry
            .register_provider("odd", broken, constructor("odd"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidModel(_)));
        assert!(!registry.is_registered("odd"));
    }

    #[test]
    fn test_set_provider_by_name_caches_lifecycle() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let registry = ProviderRegistry::new();
        registry
            .register_provider(
                "gemini",
                version_with("gemini", &["text"]),
                Arc::new(move |_: Option<String>| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(MockProvider::new("gemini")) as Arc<dyn Provider>)
                }),
            )
            .unwrap();

        let first = registry.set_provider(ProviderRequest::named("gemini")).unwrap();
        let second = registry.set_provider(ProviderRequest::named("gemini")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(first.state(), ProviderState::Ready);
        assert_eq!(registry.active_name().as_deref(), Some("gemini"));
    }

    #[test]
    fn test_set_provider_unknown_name() {
        let registry = registry_with(&["gemini"]);
        assert!(matches!(
            registry.set_provider(ProviderRequest::named("openai")),
            Err(RegistryError::Config(_))
        ));
        assert!(registry.active_provider().is_none());
    }

    #[test]
    fn test_constructor_error_propagates() {
        let registry = ProviderRegistry::new();
        registry
            .register_provider(
                "gemini",
                ProviderVersion::gemini_v1(),
                Arc::new(|_: Option<String>| {
                    Err(ProviderError::Config(DomainError::ApiKey(
                        "GEMINI_API_KEY is not set".into(),
                    )))
                }),
            )
            .unwrap();

        let err = registry
            .set_provider(ProviderRequest::named("gemini"))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Provider(ProviderError::Config(DomainError::ApiKey(_)))
        ));
    }

    #[test]
    fn test_unhealthy_provider_is_not_activated() {
        let registry = registry_with(&["gemini"]);
        let lifecycle = registry.set_provider(ProviderRequest::named("gemini")).unwrap();
        lifecycle.set_state(ProviderState::Error);

        let err = registry
            .set_provider(ProviderRequest::named("gemini"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::EmptyResponse(_)));
    }

    #[test]
    fn test_set_provider_via_selector() {
        let registry = ProviderRegistry::new();
        registry
            .register_provider("coder", version_with("coder", &["text", "code"]), constructor("coder"))
            .unwrap();
        registry
            .register_provider("chatter", version_with("chatter", &["text", "chat"]), constructor("chatter"))
            .unwrap();
        registry.set_provider(ProviderRequest::named("coder")).unwrap();
        registry.set_provider(ProviderRequest::named("chatter")).unwrap();

        let chosen = registry
            .set_provider(
                ProviderRequest::default()
                    .with_capabilities(vec![ProviderCapability::required("code")]),
            )
            .unwrap();
        assert_eq!(chosen.name(), "coder");
        assert_eq!(registry.active_name().as_deref(), Some("coder"));
    }

    #[test]
    fn test_create_provider_is_stateless() {
        let registry = registry_with(&["gemini"]);
        let provider = registry
            .create_provider("gemini", Some("key".into()))
            .unwrap();
        assert_eq!(provider.name(), "gemini");
        assert!(registry.get_provider("gemini").is_none());
        assert!(registry.active_provider().is_none());
        assert!(registry.create_provider("nope", None).is_err());
    }

    #[test]
    fn test_cleanup_clears_active_and_rejects_repeat() {
        let registry = registry_with(&["gemini"]);
        let lifecycle = registry.set_provider(ProviderRequest::named("gemini")).unwrap();

        registry.cleanup_provider("gemini").unwrap();

        assert_eq!(lifecycle.state(), ProviderState::Shutdown);
        assert!(registry.active_provider().is_none());
        assert!(matches!(
            registry.cleanup_provider("gemini"),
            Err(RegistryError::ProviderNotFound(_))
        ));
        assert!(matches!(
            registry.cleanup_provider("unknown"),
            Err(RegistryError::ProviderNotFound(_))
        ));
    }

    #[test]
    fn test_fallback_chain_validation_and_activation() {
        let registry = registry_with(&["primary", "backup"]);
        registry.set_provider(ProviderRequest::named("primary")).unwrap();

        assert!(matches!(
            registry.set_fallback_chain(vec!["backup".into(), "ghost".into()]),
            Err(RegistryError::Config(_))
        ));

        registry
            .set_fallback_chain(vec!["backup".into()])
            .unwrap();
        assert!(registry.get_provider("backup").is_some());

        let next = registry.activate_fallback().unwrap();
        assert_eq!(next.name(), "backup");
        assert_eq!(registry.active_name().as_deref(), Some("backup"));

        assert!(matches!(
            registry.activate_fallback(),
            Err(RegistryError::Retry(_))
        ));
        registry.reset_fallback_chain();
        assert_eq!(registry.fallback_provider().unwrap().name(), "backup");
    }

    #[test]
    fn test_fallback_chain_tolerates_unconstructible_member() {
        let registry = registry_with(&["primary"]);
        registry
            .register_provider(
                "keyless",
                ProviderVersion::new(
                    "keyless",
                    Version::new(1, 0, 0),
                    [ModelVersion::new("m", Version::new(1, 0, 0), ["text"])],
                    "m",
                )
                .unwrap(),
                Arc::new(|_: Option<String>| Err(ProviderError::Request("no credentials".into()))),
            )
            .unwrap();

        registry
            .set_fallback_chain(vec!["keyless".into(), "primary".into()])
            .unwrap();
        assert_eq!(registry.fallback_provider().unwrap().name(), "primary");
    }

    #[test]
    fn test_shutdown_cleans_everything() {
        let registry = registry_with(&["a", "b"]);
        let a = registry.set_provider(ProviderRequest::named("a")).unwrap();
        let b = registry.set_provider(ProviderRequest::named("b")).unwrap();

        registry.shutdown();

        assert_eq!(a.state(), ProviderState::Shutdown);
        assert_eq!(b.state(), ProviderState::Shutdown);
        assert!(registry.active_provider().is_none());
        assert_eq!(registry.registered_names(), vec!["a", "b"]);
    }
}
