//! Agent domain module
//!
//! The fixed step progression, per-task state and agent settings.

pub mod config;
pub mod extract;
pub mod state;
pub mod step;

pub use config::AgentConfig;
pub use extract::{extract_code_block, present_solution};
pub use state::{AgentState, AgentStatus};
pub use step::{Step, StepPolicy};
