//! Progress notification port
//!
//! Defines the interface for reporting progress while a task moves through
//! its steps.

use solver_domain::Step;

/// Callback for progress updates during task solving
///
/// Implementations live in the presentation layer.
pub trait StepProgressNotifier: Send + Sync {
    /// Called before each attempt at a step
    fn on_step_start(&self, step: Step, attempt: u32);

    /// Called when a step finishes successfully
    fn on_step_complete(&self, step: Step);

    /// Called when a failed step is about to be retried
    fn on_step_retry(&self, _step: Step, _retry: u32, _error: &str) {}

    /// Called for each streamed text chunk
    fn on_chunk(&self, _step: Step, _chunk: &str) {}

    /// Called when the active provider is swapped for a fallback
    fn on_provider_fallback(&self, _from: &str, _to: &str) {}

    /// Called once the whole task is finished
    fn on_task_complete(&self, _success: bool) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoStepProgress;

impl StepProgressNotifier for NoStepProgress {
    fn on_step_start(&self, _step: Step, _attempt: u32) {}
    fn on_step_complete(&self, _step: Step) {}
}
