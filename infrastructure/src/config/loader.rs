//! Configuration file loader with multi-source merging

use super::file_config::{FileConfig, FileGeminiConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use solver_domain::DomainError;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "agentic-solver";
const PROJECT_FILES: [&str; 2] = ["solver.toml", ".solver.toml"];
const ENV_PREFIX: &str = "SOLVER_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `SOLVER_*` environment variables (e.g. `SOLVER_AGENT__MAX_RETRIES`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./solver.toml` or `./.solver.toml`
    /// 4. Global: `<config_dir>/agentic-solver/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        let global = Self::global_config_path().filter(|p| p.exists());
        let project = Self::project_config_path();

        Self::file_figment(global.as_deref(), project.as_deref(), config_path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Defaults merged with the given files, lowest priority first
    fn file_figment(
        global: Option<&Path>,
        project: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));
        for path in [global, project, explicit].into_iter().flatten() {
            figment = figment.merge(Toml::file(path));
        }
        figment
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(config_path: Option<&Path>) {
        println!("Configuration sources (in priority order):");
        println!("  [     ] Environment: {}*", ENV_PREFIX);

        if let Some(path) = config_path {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            println!("  [{:<5}] Explicit: {}", mark, path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./solver.toml or ./.solver.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

/// Resolve the Gemini API key.
///
/// An explicit key wins, then `api_key` from the file, then the environment
/// variable named by `api_key_env`.
pub fn resolve_api_key(
    explicit: Option<&str>,
    gemini: &FileGeminiConfig,
) -> Result<String, DomainError> {
    resolve_api_key_with(explicit, gemini, |name| std::env::var(name).ok())
}

fn resolve_api_key_with(
    explicit: Option<&str>,
    gemini: &FileGeminiConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, DomainError> {
    explicit
        .map(str::to_string)
        .or_else(|| gemini.api_key.clone())
        .or_else(|| lookup(&gemini.api_key_env))
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            DomainError::ApiKey(format!(
                "{} environment variable is not set",
                gemini.api_key_env
            ))
        })
}
