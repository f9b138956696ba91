//! Processing steps and per-step retry policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One stage of the fixed solving sequence.
///
/// Steps only move forward: `Understand → Plan → Implement → Verify → End`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Understand,
    Plan,
    Implement,
    Verify,
    End,
}

impl Step {
    /// All steps in execution order
    pub const ORDER: [Step; 5] = [
        Step::Understand,
        Step::Plan,
        Step::Implement,
        Step::Verify,
        Step::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Understand => "understand",
            Step::Plan => "plan",
            Step::Implement => "implement",
            Step::Verify => "verify",
            Step::End => "end",
        }
    }

    /// The step that follows this one; `None` for `End`
    pub fn next(&self) -> Option<Step> {
        match self {
            Step::Understand => Some(Step::Plan),
            Step::Plan => Some(Step::Implement),
            Step::Implement => Some(Step::Verify),
            Step::Verify => Some(Step::End),
            Step::End => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::End)
    }

    /// Context key under which this step's model output is stored
    pub fn output_key(&self) -> Option<&'static str> {
        match self {
            Step::Understand => Some("understanding"),
            Step::Plan => Some("plan"),
            Step::Implement => Some("implementation"),
            Step::Verify => Some("verification"),
            Step::End => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ORDER
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown step: {}", s))
    }
}

/// Whether and how often a failing step may be re-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPolicy {
    pub retry_on_error: bool,
    /// Falls back to the agent-wide limit when `None`
    pub max_retries: Option<u32>,
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self {
            retry_on_error: true,
            max_retries: None,
        }
    }
}

impl StepPolicy {
    pub fn no_retry() -> Self {
        Self {
            retry_on_error: false,
            max_retries: Some(0),
        }
    }

    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            retry_on_error: true,
            max_retries: Some(max_retries),
        }
    }

    /// Decide on another attempt after a failure.
    ///
    /// `retry_count` already includes the failure just recorded.
    pub fn allows_retry(&self, retry_count: u32, default_max: u32) -> bool {
        self.retry_on_error && retry_count <= self.max_retries.unwrap_or(default_max)
    }
}
