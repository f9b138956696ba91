//! Task value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// A natural-language task for the agent to solve (Value Object)
///
/// Always non-empty after trimming; construction is the validation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    content: String,
}

impl Task {
    /// Create a new task, rejecting empty or whitespace-only input
    pub fn try_new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::EmptyInput);
        }
        Ok(Self { content })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

impl TryFrom<&str> for Task {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Task::try_new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::try_new("Write fizzbuzz").unwrap();
        assert_eq!(task.content(), "Write fizzbuzz");
    }

    #[test]
    fn test_empty_and_whitespace_rejected() {
        assert_eq!(Task::try_new(""), Err(DomainError::EmptyInput));
        assert_eq!(Task::try_new("  \n\t "), Err(DomainError::EmptyInput));
    }

    #[test]
    fn test_try_from_str() {
        let task: Task = "sort a list".try_into().unwrap();
        assert_eq!(task.to_string(), "sort a list");
    }
}
