//! Application layer for agentic-solver
//!
//! This crate contains the step sequencer, port definitions and provider
//! management (lifecycle, selection, registry, retry).
//! It depends only on the domain layer.

pub mod ports;
pub mod provider;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    generation::{GenerationService, ServiceError, ServiceErrorKind, TextStream},
    progress::{NoStepProgress, StepProgressNotifier},
    provider::{Provider, ProviderError},
};
pub use provider::{
    ProviderConstructor, ProviderLifecycle, ProviderRegistry, ProviderRequest, ProviderSelector,
    RegistryError, RetryPolicy, ServiceProvider,
};
pub use use_cases::solve_task::{SolveTaskError, SolveTaskInput, SolveTaskUseCase};
