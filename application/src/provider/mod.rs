//! Provider management
//!
//! - [`retry::RetryPolicy`]: exponential backoff for rate-limited calls
//! - [`service::ServiceProvider`]: [`Provider`](crate::ports::provider::Provider) over a raw generation service
//! - [`lifecycle::ProviderLifecycle`]: state machine, health and stats per provider
//! - [`selector::ProviderSelector`]: capability routing and the fallback chain
//! - [`registry::ProviderRegistry`]: constructors, cached lifecycles, active provider

pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod retry;
pub mod selector;
pub mod service;

pub use error::RegistryError;
pub use lifecycle::ProviderLifecycle;
pub use registry::{ProviderConstructor, ProviderRegistry, ProviderRequest};
pub use retry::RetryPolicy;
pub use selector::ProviderSelector;
pub use service::ServiceProvider;
