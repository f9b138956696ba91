//! Conversation entities

use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Well-known metadata keys
pub mod meta {
    pub const TIMESTAMP: &str = "timestamp";
    pub const PRIORITY: &str = "priority";
    pub const TOOL_CALL_ID: &str = "tool_call_id";
    pub const RETRIES: &str = "retries";
    pub const STEP: &str = "step";
    pub const INITIALIZATION: &str = "initialization";
}

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority attached to stored messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl MessagePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagePriority::Low => "low",
            MessagePriority::Normal => "normal",
            MessagePriority::High => "high",
            MessagePriority::Critical => "critical",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(MessagePriority::Low),
            "normal" => Some(MessagePriority::Normal),
            "high" => Some(MessagePriority::High),
            "critical" => Some(MessagePriority::Critical),
            _ => None,
        }
    }
}

/// A message exchanged between the user and the model (Entity)
///
/// Content is fixed once created; only metadata may be updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, Value>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Tool result message, linked to the originating call
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self::new(Role::Tool, content).with_metadata(meta::TOOL_CALL_ID, tool_call_id.into())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn all_metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Stamp timestamp and priority, as done when appending to history
    pub fn stamp(&mut self, at: DateTime<Utc>, priority: MessagePriority) {
        self.set_metadata(meta::TIMESTAMP, at.to_rfc3339());
        self.set_metadata(meta::PRIORITY, priority.as_str());
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.metadata(meta::TIMESTAMP)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    /// Stored priority, `Normal` when absent
    pub fn priority(&self) -> MessagePriority {
        self.metadata(meta::PRIORITY)
            .and_then(Value::as_str)
            .and_then(MessagePriority::parse)
            .unwrap_or_default()
    }
}

/// Check ordering rules over a message history.
///
/// A `user` message must not be immediately followed by another `user`
/// message, and stamped timestamps must never go backwards.
pub fn validate_sequence(messages: &[Message]) -> Result<(), DomainError> {
    for (index, pair) in messages.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);

        if prev.role == Role::User && next.role == Role::User {
            return Err(DomainError::InvalidMessageSequence(format!(
                "user message at position {} is followed by another user message",
                index
            )));
        }

        if let (Some(a), Some(b)) = (prev.timestamp(), next.timestamp())
            && b < a
        {
            return Err(DomainError::InvalidMessageSequence(format!(
                "message at position {} predates its predecessor",
                index + 1
            )));
        }
    }
    Ok(())
}
