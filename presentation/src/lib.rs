//! Presentation layer for agentic-solver
//!
//! This crate contains CLI definitions, output formatters
//! and progress reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use output::report::{SolveReport, StepRecord};
pub use progress::reporter::{SimpleProgress, StepProgressReporter};
