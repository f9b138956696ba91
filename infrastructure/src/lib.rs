//! Infrastructure layer for agentic-solver
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading
//! and the Gemini HTTP client.

pub mod config;
pub mod providers;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileAgentConfig, FileConfig, FileGeminiConfig, FileGenerationConfig,
    FileProvidersConfig, FileRetryConfig, resolve_api_key,
};
pub use providers::{GeminiClient, GeminiSettings, register_gemini};
