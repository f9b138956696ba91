//! CLI entrypoint for Agentic Solver
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use solver_application::{
    NoStepProgress, ProviderRegistry, ProviderRequest, SolveTaskInput, SolveTaskUseCase,
    StepProgressNotifier,
};
use solver_domain::AgentState;
use solver_infrastructure::{
    ConfigLoader, FileConfig, GeminiSettings, register_gemini, resolve_api_key,
};
use solver_presentation::{
    Cli, ConsoleFormatter, SimpleProgress, SolveReport, StepProgressReporter,
};
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = match init_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", ConsoleFormatter::format_error(&format!("{:#}", e)));
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", ConsoleFormatter::format_error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, and to `--log-file` when given.
///
/// `RUST_LOG` takes precedence over `-v`.
fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    let (file_layer, guard) = match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Fold command-line flags into the loaded configuration
fn apply_cli_overrides(cli: &Cli, config: &mut FileConfig) {
    if let Some(model) = &cli.model {
        config.generation.model = model.clone();
    }
    if let Some(provider) = &cli.provider {
        config.providers.default = provider.clone();
    }
    if !cli.fallback.is_empty() {
        config.providers.fallback = cli.fallback.clone();
    }
    if let Some(max_retries) = cli.max_retries {
        config.agent.max_retries = max_retries;
    }
    if let Some(timeout) = cli.timeout {
        config.agent.task_timeout_secs = timeout;
    }
    if cli.stream {
        config.agent.streaming = true;
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let Some(task) = cli.task.clone() else {
        bail!("A task is required. Usage: solver \"<task>\"");
    };

    info!("Starting Agentic Solver");

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    apply_cli_overrides(&cli, &mut config);
    config.validate()?;
    debug!(
        provider = %config.providers.default,
        model = %config.generation.model,
        streaming = config.agent.streaming,
        "Configuration loaded"
    );

    let agent_config = config.to_agent_config()?;
    let generation = config.generation.to_generation_config()?;
    let overrides = cli.generation_overrides();
    // Reject bad overrides before anything is sent
    overrides.apply_to(&generation)?;
    let api_key = resolve_api_key(cli.api_key.as_deref(), &config.providers.gemini)?;

    // === Dependency Injection ===
    let registry = Arc::new(ProviderRegistry::new());
    register_gemini(
        &registry,
        GeminiSettings {
            api_key: Some(api_key),
            api_key_env: config.providers.gemini.api_key_env.clone(),
            base_url: config.providers.gemini.base_url.clone(),
            generation: generation.clone(),
            retry: config.retry.to_retry_policy(),
        },
    )?;
    let lifecycle = registry.set_provider(ProviderRequest::named(config.providers.default.as_str()))?;
    if !config.providers.fallback.is_empty() {
        registry.set_fallback_chain(config.providers.fallback.clone())?;
    }

    if !cli.quiet {
        eprintln!(
            "{}\n",
            ConsoleFormatter::header(&task, lifecycle.name(), generation.model())
        );
    }

    let progress: Box<dyn StepProgressNotifier> = if cli.quiet {
        Box::new(NoStepProgress)
    } else if agent_config.streaming {
        Box::new(SimpleProgress)
    } else {
        Box::new(StepProgressReporter::new())
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling task");
            ctrl_c.cancel();
        }
    });

    let input = SolveTaskInput::new(task.as_str())
        .with_streaming(agent_config.streaming)
        .with_overrides(overrides)
        .with_cancellation(cancel.clone());
    let use_case = SolveTaskUseCase::new(Arc::clone(&registry), agent_config.clone());
    let mut state = AgentState::new();

    let outcome = tokio::time::timeout(
        agent_config.task_timeout,
        use_case.execute(&mut state, input, progress.as_ref()),
    )
    .await;

    let provider_name = registry.active_name();
    registry.shutdown();

    match outcome {
        Err(_) => {
            cancel.cancel();
            bail!(
                "Task timed out after {}s",
                agent_config.task_timeout.as_secs()
            );
        }
        Ok(result) => {
            result?;
        }
    }

    let report = SolveReport::from_state(&task, provider_name.as_deref(), &state);
    println!("{}", ConsoleFormatter::format(&report, cli.output.into()));

    Ok(())
}
