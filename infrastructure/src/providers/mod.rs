//! Concrete generation providers
//!
//! Each provider module exposes a raw [`GenerationService`] adapter and a
//! `register_*` helper that installs its constructor in a
//! [`ProviderRegistry`].
//!
//! [`GenerationService`]: solver_application::GenerationService
//! [`ProviderRegistry`]: solver_application::ProviderRegistry

pub mod gemini;

pub use gemini::{GeminiClient, GeminiSettings, register_gemini};
