//! Domain layer for agentic-solver
//!
//! This crate contains the core entities and value objects of the solver.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Steps
//!
//! A task is driven through a fixed sequence of steps:
//! `Understand → Plan → Implement → Verify → End`. Each model-backed step
//! renders a prompt from the task context and stores the model output under
//! a step-specific key for the next step to consume.
//!
//! ## Providers
//!
//! Providers are described statically by [`ProviderVersion`] (models and
//! their capabilities) and tracked at runtime through [`ProviderState`],
//! [`HealthStatus`] and [`ProviderStats`].

pub mod agent;
pub mod config;
pub mod core;
pub mod generation;
pub mod prompt;
pub mod provider;
pub mod session;

// Re-export commonly used types
pub use agent::{
    AgentConfig, AgentState, AgentStatus, Step, StepPolicy, extract_code_block, present_solution,
};
pub use config::OutputFormat;
pub use core::{error::DomainError, task::Task};
pub use generation::{
    config::{GenerationConfig, GenerationOverrides},
    key::GenerationKey,
};
pub use prompt::StepPromptTemplates;
pub use provider::{
    capability::ProviderCapability,
    health::{HealthStatus, MAX_ERROR_RATE, ProviderState, ProviderStats},
    version::{ModelVersion, ProviderVersion, Version},
};
pub use session::entities::{Message, MessagePriority, Role, validate_sequence};
