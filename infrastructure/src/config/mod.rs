//! Configuration file loading for agentic-solver
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `SOLVER_*` environment variables (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./solver.toml` or `./.solver.toml`
//! 4. Global: `<config_dir>/agentic-solver/config.toml`
//! 5. Default values
//!
//! Command-line flags are applied on top by the binary.

mod file_config;
mod loader;

pub use file_config::{
    FileAgentConfig, FileConfig, FileGeminiConfig, FileGenerationConfig, FileProvidersConfig,
    FileRetryConfig,
};
pub use loader::{ConfigLoader, resolve_api_key};
