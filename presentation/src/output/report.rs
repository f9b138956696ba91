//! Serializable summary of a task run

use serde::Serialize;
use serde_json::Value;
use solver_domain::session::entities::meta;
use solver_domain::{AgentState, AgentStatus, Role};

/// One completed step as recorded in the message history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub step: String,
    pub output: String,
    /// Failed attempts before this output was produced
    pub retries: u64,
}

/// Everything `--output json` prints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveReport {
    pub task: String,
    pub provider: Option<String>,
    pub status: AgentStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub step_count: u32,
    pub steps: Vec<StepRecord>,
}

impl SolveReport {
    pub fn from_state(task: &str, provider: Option<&str>, state: &AgentState) -> Self {
        let steps = state
            .messages()
            .iter()
            .filter(|m| m.role() == Role::Assistant)
            .filter_map(|m| {
                let step = m.metadata(meta::STEP)?.as_str()?.to_string();
                Some(StepRecord {
                    step,
                    output: m.content().to_string(),
                    retries: m.metadata(meta::RETRIES).and_then(Value::as_u64).unwrap_or(0),
                })
            })
            .collect();

        Self {
            task: task.to_string(),
            provider: provider.map(str::to_string),
            status: state.status(),
            result: state.result().map(str::to_string),
            error: state.error().map(str::to_string),
            step_count: state.step_count(),
            steps,
        }
    }
}
