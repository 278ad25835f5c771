//! The restart action: confirm, stamp the pod template, submit.

use std::sync::Arc;

use kubeact_core::resource::WorkloadResource;

use crate::apply::RemoteApply;
use crate::authorization::EntryPointGuard;
use crate::confirmation::{ConfirmationGate, ConfirmationPrompt};
use crate::error::ActionError;
use crate::mutation::{supports, MutationBuilder};
use crate::scheduler::ActionScheduler;
use crate::task::{ActionTask, ApplyCommand, TaskHandle};
use crate::telemetry::{emit_quietly, TelemetryEmitter, TelemetryEvent};
use crate::types::{Intent, Navigation, TaskMessages};

/// Result of a restart request that did not fail.
#[derive(Debug)]
pub enum RequestOutcome {
    /// The task is in its grace window.
    Submitted(TaskHandle),
    /// The user declined; nothing was created or notified.
    Declined,
}

impl RequestOutcome {
    pub fn handle(&self) -> Option<&TaskHandle> {
        match self {
            RequestOutcome::Submitted(handle) => Some(handle),
            RequestOutcome::Declined => None,
        }
    }
}

/// Caller that wires the restart flow onto a scheduler.
pub struct RestartAction {
    scheduler: ActionScheduler,
    builder: MutationBuilder,
    remote: Arc<dyn RemoteApply>,
    confirmation: Arc<dyn ConfirmationGate>,
    telemetry: Arc<dyn TelemetryEmitter>,
    guard: Option<EntryPointGuard>,
}

impl RestartAction {
    pub fn new(
        scheduler: ActionScheduler,
        remote: Arc<dyn RemoteApply>,
        confirmation: Arc<dyn ConfirmationGate>,
        telemetry: Arc<dyn TelemetryEmitter>,
    ) -> Self {
        Self {
            scheduler,
            builder: MutationBuilder::new(),
            remote,
            confirmation,
            telemetry,
            guard: None,
        }
    }

    pub fn with_builder(mut self, builder: MutationBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Require an authorization decision before prompting.
    pub fn with_guard(mut self, guard: EntryPointGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn scheduler(&self) -> &ActionScheduler {
        &self.scheduler
    }

    /// Whether a restart entry point should be offered for `resource`.
    pub async fn is_available(&self, resource: &WorkloadResource) -> bool {
        match &self.guard {
            Some(guard) => guard.is_visible(resource, Intent::Restart).await,
            None => supports(&resource.kind(), Intent::Restart),
        }
    }

    /// Ask to restart `resource`. `location` is where the user currently is;
    /// it becomes the destination after a cancel or a failure.
    pub async fn request(
        &self,
        resource: &WorkloadResource,
        location: &str,
    ) -> Result<RequestOutcome, ActionError> {
        let kind = resource.kind();
        if !supports(&kind, Intent::Restart) {
            return Err(ActionError::UnsupportedIntent {
                kind,
                intent: Intent::Restart,
            });
        }
        if let Some(guard) = &self.guard {
            guard.authorize(resource).await?;
        }

        let reference = resource.resource_ref();
        let target = reference.target_key();
        if self.scheduler.is_active(&target) {
            return Err(ActionError::DuplicateActiveAction(target));
        }

        let prompt = ConfirmationPrompt::new(
            reference.clone(),
            resource.display_name(),
            Intent::Restart,
        );
        if !self.confirmation.confirm(&prompt).await {
            tracing::debug!(target_key = %target, "Restart declined");
            return Ok(RequestOutcome::Declined);
        }

        emit_quietly(
            self.telemetry.as_ref(),
            TelemetryEvent::restart_confirmed(reference),
        );

        let mutated = self.builder.build(resource, Intent::Restart)?;
        tracing::debug!(
            target_key = %target,
            stamped_at = %mutated.stamped_at.to_iso8601(),
            "Restart manifest prepared"
        );

        let command = ApplyCommand::new(mutated, Arc::clone(&self.remote));
        let task = ActionTask::new(target, resource.display_name(), Box::new(command))
            .with_messages(TaskMessages::restart())
            .with_navigation(Navigation {
                on_success: None,
                on_cancel: Some(location.to_string()),
                on_error: Some(location.to_string()),
            });

        self.scheduler.submit(task).map(RequestOutcome::Submitted)
    }
}
