//! Generation parameters.
//!
//! - [`config::GenerationConfig`]: validated parameter bag owned by a provider
//! - [`config::GenerationOverrides`]: per-call overrides that never touch stored config
//! - [`key::GenerationKey`]: the enumerated set of recognised keys

pub mod config;
pub mod key;
