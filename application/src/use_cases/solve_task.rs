//! Solve Task use case.
//!
//! Drives a task through the fixed step sequence
//! (`Understand → Plan → Implement → Verify → End`). Each model-backed step
//! renders its prompt from the task context, calls the active provider and
//! stores the output for the next step. `End` makes no model call: it
//! extracts the final solution from the implementation output.
//!
//! Two retry layers apply. The provider retries rate-limited calls with
//! backoff; on top of that a failed step may be re-run per its
//! [`StepPolicy`].

use crate::ports::progress::StepProgressNotifier;
use crate::ports::provider::ProviderError;
use crate::provider::{ProviderLifecycle, ProviderRegistry, RegistryError};
use solver_domain::session::entities::meta;
use solver_domain::{
    AgentConfig, AgentState, DomainError, GenerationOverrides, Message, MessagePriority, Role,
    Step, StepPolicy, StepPromptTemplates, Task, present_solution,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors that can occur while solving a task
#[derive(Error, Debug)]
pub enum SolveTaskError {
    #[error("Task cannot be empty")]
    EmptyInput,

    #[error("No active provider configured")]
    NoActiveProvider,

    #[error("Prompt error: {0}")]
    Template(DomainError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Step '{step}' failed after {attempts} attempt(s): {source}")]
    StepFailed {
        step: Step,
        attempts: u32,
        #[source]
        source: Box<SolveTaskError>,
    },

    #[error("Step limit of {0} attempts reached")]
    StepLimitExceeded(u32),

    #[error("Operation cancelled")]
    Cancelled,
}

impl SolveTaskError {
    /// Whether the step-level policy may re-run the step.
    ///
    /// Validation and template errors never are.
    pub fn is_step_retryable(&self) -> bool {
        match self {
            SolveTaskError::Provider(e) => e.is_transient(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SolveTaskError::Cancelled)
    }
}

/// Input for the [`SolveTaskUseCase`]
#[derive(Debug, Clone)]
pub struct SolveTaskInput {
    pub task: String,
    /// Use `generate_stream` instead of `generate`
    pub streaming: bool,
    /// Per-call overrides applied to every step's request
    pub overrides: GenerationOverrides,
    pub cancellation: Option<CancellationToken>,
}

impl SolveTaskInput {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            streaming: false,
            overrides: GenerationOverrides::none(),
            cancellation: None,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_overrides(mut self, overrides: GenerationOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Use case for solving a task step by step
pub struct SolveTaskUseCase {
    registry: Arc<ProviderRegistry>,
    templates: StepPromptTemplates,
    config: AgentConfig,
    policies: HashMap<Step, StepPolicy>,
}

impl SolveTaskUseCase {
    pub fn new(registry: Arc<ProviderRegistry>, config: AgentConfig) -> Self {
        Self {
            registry,
            templates: StepPromptTemplates::default(),
            config,
            policies: HashMap::new(),
        }
    }

    pub fn with_templates(mut self, templates: StepPromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Override the retry policy of one step
    pub fn with_step_policy(mut self, step: Step, policy: StepPolicy) -> Self {
        self.policies.insert(step, policy);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn policy_for(&self, step: Step) -> StepPolicy {
        self.policies.get(&step).copied().unwrap_or_default()
    }

    /// Solve `input.task`, recording progress in `state`.
    ///
    /// `state` is reset first. On failure the error is logged, stored in
    /// `state` and returned; the run does not resume.
    pub async fn execute(
        &self,
        state: &mut AgentState,
        input: SolveTaskInput,
        progress: &dyn StepProgressNotifier,
    ) -> Result<String, SolveTaskError> {
        state.reset();
        state.start();

        let outcome = self.run(state, &input, progress).await;
        match outcome {
            Ok(answer) => {
                info!(steps = state.step_count(), "Task completed");
                progress.on_task_complete(true);
                Ok(answer)
            }
            Err(e) => {
                error!(step = %state.current_step(), error = %e, "Task failed");
                state.fail(e.to_string());
                progress.on_task_complete(false);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        state: &mut AgentState,
        input: &SolveTaskInput,
        progress: &dyn StepProgressNotifier,
    ) -> Result<String, SolveTaskError> {
        let task = Task::try_new(input.task.as_str()).map_err(|_| SolveTaskError::EmptyInput)?;
        let mut lifecycle = self
            .registry
            .active_provider()
            .ok_or(SolveTaskError::NoActiveProvider)?;

        info!(provider = lifecycle.name(), streaming = input.streaming, "Solving task");
        state.set_context("task", task.content());

        while state.should_continue() {
            let step = state.current_step();
            self.check_cancelled(input)?;
            self.check_step_budget(state)?;
            lifecycle = self.ensure_healthy(lifecycle, progress)?;

            state.begin_attempt();
            let attempt = state.retry_count() + 1;
            progress.on_step_start(step, attempt);
            info!(step = %step, attempt, "Starting step");

            match self.run_step(state, step, &lifecycle, input, progress).await {
                Ok((prompt, output)) => {
                    self.record_step(state, step, prompt, output);
                    self.registry.update_load(&lifecycle);
                    progress.on_step_complete(step);
                }
                Err(e) if e.is_step_retryable() => {
                    let retries = state.record_failure();
                    if !self.policy_for(step).allows_retry(retries, self.config.max_retries) {
                        return Err(SolveTaskError::StepFailed {
                            step,
                            attempts: retries,
                            source: Box::new(e),
                        });
                    }
                    warn!(step = %step, retry = retries, error = %e, "Step failed, retrying");
                    progress.on_step_retry(step, retries, &e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        self.finish(state, progress)
    }

    /// One attempt at a model-backed step; returns the prompt and output
    async fn run_step(
        &self,
        state: &AgentState,
        step: Step,
        lifecycle: &ProviderLifecycle,
        input: &SolveTaskInput,
        progress: &dyn StepProgressNotifier,
    ) -> Result<(String, String), SolveTaskError> {
        let prompt = self
            .templates
            .render(step, state.context())
            .map_err(SolveTaskError::Template)?;
        debug!(step = %step, prompt = %prompt, "Rendered prompt");

        let output = if input.streaming {
            self.cancellable(
                input,
                lifecycle.generate_stream(&prompt, input.overrides, |chunk| {
                    progress.on_chunk(step, chunk)
                }),
            )
            .await?
        } else {
            self.cancellable(input, lifecycle.generate(&prompt, input.overrides))
                .await?
        };

        debug!(step = %step, response = %output, "Step output");
        Ok((prompt, output))
    }

    fn record_step(&self, state: &mut AgentState, step: Step, prompt: String, output: String) {
        let retries = state.retry_count();
        if let Some(key) = step.output_key() {
            state.set_context(key, output.clone());
        }
        state.push_message(
            Message::user(prompt).with_metadata(meta::STEP, step.as_str()),
            MessagePriority::Normal,
        );
        let mut reply = Message::assistant(output).with_metadata(meta::STEP, step.as_str());
        if retries > 0 {
            reply.set_metadata(meta::RETRIES, retries);
        }
        state.push_message(reply, MessagePriority::Normal);
        state.advance();
        info!(step = %step, next = %state.current_step(), "Step complete");
    }

    /// `End`: present the implementation output as the final result
    fn finish(
        &self,
        state: &mut AgentState,
        progress: &dyn StepProgressNotifier,
    ) -> Result<String, SolveTaskError> {
        self.check_step_budget(state)?;
        state.begin_attempt();
        progress.on_step_start(Step::End, 1);

        let source = state
            .context_value("implementation")
            .map(str::to_string)
            .or_else(|| {
                state
                    .messages()
                    .iter()
                    .rev()
                    .find(|m| m.role() == Role::Assistant)
                    .map(|m| m.content().to_string())
            })
            .unwrap_or_default();

        let answer = present_solution(&source);
        state.push_message(
            Message::assistant(answer.clone()).with_metadata(meta::STEP, Step::End.as_str()),
            MessagePriority::High,
        );
        state.complete(answer.clone());
        progress.on_step_complete(Step::End);
        Ok(answer)
    }

    /// Swap an unhealthy provider for the next fallback, if a chain exists
    fn ensure_healthy(
        &self,
        current: Arc<ProviderLifecycle>,
        progress: &dyn StepProgressNotifier,
    ) -> Result<Arc<ProviderLifecycle>, SolveTaskError> {
        if current.check_health() {
            return Ok(current);
        }
        if self.registry.fallback_chain().is_empty() {
            warn!(
                provider = current.name(),
                "Active provider is unhealthy and no fallback is configured"
            );
            return Ok(current);
        }

        let next = self.registry.activate_fallback()?;
        warn!(from = current.name(), to = next.name(), "Switching to fallback provider");
        progress.on_provider_fallback(current.name(), next.name());
        Ok(next)
    }

    fn check_step_budget(&self, state: &AgentState) -> Result<(), SolveTaskError> {
        if state.step_count() >= self.config.max_steps {
            return Err(SolveTaskError::StepLimitExceeded(self.config.max_steps));
        }
        Ok(())
    }

    fn check_cancelled(&self, input: &SolveTaskInput) -> Result<(), SolveTaskError> {
        match &input.cancellation {
            Some(token) if token.is_cancelled() => Err(SolveTaskError::Cancelled),
            _ => Ok(()),
        }
    }

    async fn cancellable<T, F>(&self, input: &SolveTaskInput, call: F) -> Result<T, SolveTaskError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match &input.cancellation {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(SolveTaskError::Cancelled),
                result = call => result.map_err(SolveTaskError::from),
            },
            None => call.await.map_err(SolveTaskError::from),
        }
    }
}
