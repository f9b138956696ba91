//! Per-task agent state

use super::step::Step;
use crate::core::error::DomainError;
use crate::session::entities::{Message, MessagePriority, meta, validate_sequence};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SYSTEM_PROMPT: &str =
    "You are a problem-solving assistant. Work through each task step by step.";

/// Overall status of a task run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Mutable record of a single task run (Entity)
///
/// `step_count` only grows within a run and `current_step` only moves
/// forward; a retried step stays where it is. Once `error` is set the run
/// is over and a new one must start from [`reset`](Self::reset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    messages: Vec<Message>,
    current_step: Step,
    step_count: u32,
    retry_count: u32,
    error: Option<String>,
    result: Option<String>,
    context: BTreeMap<String, String>,
    status: AgentStatus,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentState {
    pub fn new() -> Self {
        let mut state = Self {
            messages: Vec::new(),
            current_step: Step::Understand,
            step_count: 0,
            retry_count: 0,
            error: None,
            result: None,
            context: BTreeMap::new(),
            status: AgentStatus::Idle,
        };
        state.push_message(
            Message::system(SYSTEM_PROMPT).with_metadata(meta::INITIALIZATION, true),
            MessagePriority::High,
        );
        state
    }

    /// Return to initial values between tasks
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // ==================== Queries ====================

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    /// False once an error is recorded or `End` is reached
    pub fn should_continue(&self) -> bool {
        self.error.is_none() && !self.current_step.is_terminal()
    }

    /// Messages at or above `min` priority, in insertion order
    pub fn messages_with_priority(&self, min: MessagePriority) -> Vec<&Message> {
        self.messages.iter().filter(|m| m.priority() >= min).collect()
    }

    /// Case-insensitive content search
    pub fn search_messages(&self, query: &str) -> Vec<&Message> {
        let needle = query.to_lowercase();
        self.messages
            .iter()
            .filter(|m| m.content().to_lowercase().contains(&needle))
            .collect()
    }

    pub fn validate_messages(&self) -> Result<(), DomainError> {
        validate_sequence(&self.messages)
    }

    // ==================== Mutations ====================

    /// Append a message, stamping timestamp and priority
    pub fn push_message(&mut self, mut message: Message, priority: MessagePriority) {
        message.stamp(Utc::now(), priority);
        self.messages.push(message);
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.context.insert(key.into(), value.into());
    }

    pub fn start(&mut self) {
        self.status = AgentStatus::Running;
    }

    /// Count one attempt at the current step
    pub fn begin_attempt(&mut self) {
        self.step_count += 1;
    }

    /// Count a failed attempt; returns the updated retry count
    pub fn record_failure(&mut self) -> u32 {
        self.retry_count += 1;
        self.retry_count
    }

    /// Successful step: clear retries and move to the next step
    pub fn advance(&mut self) {
        self.retry_count = 0;
        if let Some(next) = self.current_step.next() {
            self.current_step = next;
        }
    }

    pub fn complete(&mut self, result: impl Into<String>) {
        self.result = Some(result.into());
        self.status = AgentStatus::Completed;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.status = AgentStatus::Failed;
    }
}
