//! Provider descriptors and health bookkeeping.
//!
//! - [`version::ProviderVersion`] / [`version::ModelVersion`]: static capability descriptors
//! - [`capability::ProviderCapability`]: a routing requirement
//! - [`health`]: lifecycle state, health snapshot and usage statistics

pub mod capability;
pub mod health;
pub mod version;
