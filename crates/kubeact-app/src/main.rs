//! kubeact binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Wire the restart action onto a scheduler with terminal collaborators
//! 4. Wait for the task to finish, cancelling on request or Ctrl-C

mod adapters;
mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kubeact_action::{
    ActionScheduler, AllowAll, AuthCheckError, AutoConfirm, ConfirmationGate, EntryPointGuard,
    MutationBuilder, NoopNavigator, RequestOutcome, RestartAction, TaskState, TracingEmitter,
    TracingSink,
};
use kubeact_core::config::KubeactConfig;
use kubeact_core::resource::WorkloadResource;
use kubeact_core::types::{ResourceRef, Verb};

use adapters::{FileApply, StdinConfirm};
use cli::{CliArgs, Command, RestartArgs};

async fn run_restart(
    args: RestartArgs,
    mut config: KubeactConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    args.apply_overrides(&mut config);

    let text = std::fs::read_to_string(&args.manifest)?;
    let resource = WorkloadResource::from_json(&text)?;
    tracing::info!(resource = %resource.resource_ref(), "Manifest loaded");

    let scheduler = ActionScheduler::new(
        &config.scheduler,
        Arc::new(TracingSink),
        Arc::new(NoopNavigator),
    );
    let confirmation: Arc<dyn ConfirmationGate> = if args.yes {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(StdinConfirm)
    };
    let verb: Verb = config.restart.auth_verb.parse()?;
    let guard = EntryPointGuard::new(
        Arc::new(AllowAll),
        verb,
        Box::new(|resource: &ResourceRef, e: &AuthCheckError| {
            tracing::error!(resource = %resource, error = %e, "Authorization check failed");
        }),
    );

    let action = RestartAction::new(
        scheduler.clone(),
        Arc::new(FileApply::new(args.output.clone())),
        confirmation,
        Arc::new(TracingEmitter),
    )
    .with_builder(MutationBuilder::new().annotation_key(&config.restart.annotation_key))
    .with_guard(guard);

    if !action.is_available(&resource).await {
        return Err(format!("{} cannot be restarted", resource.resource_ref()).into());
    }

    let handle = match action.request(&resource, &args.location).await? {
        RequestOutcome::Submitted(handle) => handle,
        RequestOutcome::Declined => {
            tracing::info!("Restart declined");
            return Ok(());
        }
    };

    if let Some(ms) = args.cancel_after_ms {
        let scheduler = scheduler.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            if !scheduler.cancel(&handle) {
                tracing::info!("Too late to cancel; restart already dispatched");
            }
        });
    }

    let state = tokio::select! {
        state = handle.finished() => state,
        _ = tokio::signal::ctrl_c() => {
            if scheduler.cancel(&handle) {
                tracing::info!("Interrupted; cancelling restart");
            }
            handle.finished().await
        }
    };

    tracing::info!(task_id = %handle.id(), state = %state, "Done");
    if state == TaskState::Failed {
        return Err(format!("restart of {} failed", resource.resource_ref()).into());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let config = KubeactConfig::load_or_default(&config_file);
    let log_level = args.resolve_log_level(&config);

    // Tracing goes to stderr; stdout carries the applied manifest.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting kubeact v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    match args.command {
        Command::Restart(restart) => run_restart(restart, config).await,
    }
}
