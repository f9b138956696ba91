//! CLI command definitions

use clap::{Parser, ValueEnum};
use solver_domain::GenerationOverrides;
use std::path::PathBuf;

/// Output format for the final result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Only the final solution
    #[default]
    Text,
    /// Solution plus step transcript as JSON
    Json,
}

impl From<OutputFormat> for solver_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => solver_domain::OutputFormat::Text,
            OutputFormat::Json => solver_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for agentic-solver
#[derive(Parser, Debug)]
#[command(name = "solver")]
#[command(author, version, about = "Solve a task step by step with an LLM")]
#[command(long_about = r#"
Agentic Solver works through a task in fixed steps:

1. Understand: restate the task
2. Plan: outline an approach
3. Implement: produce the solution, code inside [CODE] ... [/CODE]
4. Verify: review the implementation
5. End: extract and present the solution

Configuration files are loaded from (in priority order):
1. SOLVER_* environment variables (e.g. SOLVER_AGENT__MAX_RETRIES=5)
2. --config <path>     Explicit config file
3. ./solver.toml       Project-level config
4. ~/.config/agentic-solver/config.toml   Global config

The Gemini API key is read from GEMINI_API_KEY unless --api-key is given.

Example:
  solver "Write a function that reverses a string"
  solver --stream -t 0.2 "Parse a CSV line in Python"
  solver -o json "FizzBuzz in Rust" > run.json
"#)]
pub struct Cli {
    /// The task to solve (not required with --show-config)
    pub task: Option<String>,

    /// Model to use (overrides [generation] model)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Sampling temperature, 0.0 to 1.0
    #[arg(short, long, value_name = "TEMP")]
    pub temperature: Option<f64>,

    /// Maximum tokens per response
    #[arg(long, value_name = "N")]
    pub max_tokens: Option<u32>,

    /// Stream responses as they are generated
    #[arg(short, long)]
    pub stream: bool,

    /// Provider to activate (overrides [providers] default)
    #[arg(short, long, value_name = "NAME")]
    pub provider: Option<String>,

    /// Fallback providers, in order (comma separated or repeated)
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    pub fallback: Vec<String>,

    /// Step-level retries
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Give up on the task after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// API key (overrides the environment variable)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// Default log filter for the verbosity count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Per-call overrides from `--max-tokens` / `--temperature`
    pub fn generation_overrides(&self) -> GenerationOverrides {
        GenerationOverrides {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}
