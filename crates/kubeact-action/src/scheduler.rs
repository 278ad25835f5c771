//! Deferred execution with a cancel grace window.
//!
//! Every submitted task gets a driver on the Tokio runtime that sleeps through
//! the grace period. A successful [`ActionScheduler::cancel`] finishes the task
//! itself and wakes the driver, which then exits. Otherwise the driver asks the
//! registry to close the window and, if it wins, runs the command on a task of
//! its own so a panicking command still ends as `Failed`. For each terminal
//! outcome the notification is delivered first, then the state is committed,
//! then navigation is requested.

use std::sync::Arc;
use std::time::Duration;

use kubeact_core::config::SchedulerConfig;
use kubeact_core::types::TargetKey;
use tokio::sync::{broadcast, Notify};
use uuid::Uuid;

use crate::error::ActionError;
use crate::events::LifecycleEvent;
use crate::notify::{Navigator, Notification, NotificationSink};
use crate::registry::{TaskRegistry, WindowOutcome};
use crate::task::{ActionCommand, ActionTask, TaskContext, TaskHandle};
use crate::types::{NotificationKind, TaskRecord, TaskState};

struct Shared {
    registry: TaskRegistry,
    sink: Arc<dyn NotificationSink>,
    navigator: Arc<dyn Navigator>,
    grace_period: Duration,
}

/// Accepts tasks and drives them through their lifecycle.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct ActionScheduler {
    shared: Arc<Shared>,
}

impl ActionScheduler {
    pub fn new(
        config: &SchedulerConfig,
        sink: Arc<dyn NotificationSink>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: TaskRegistry::new(config.history_limit, config.event_capacity),
                sink,
                navigator,
                grace_period: config.grace_period(),
            }),
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.shared.grace_period
    }

    /// Submit a task. Returns once its grace window is open.
    ///
    /// Fails with [`ActionError::DuplicateActiveAction`] if another task on the
    /// same target has not yet finished; in that case nothing is notified.
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, task: ActionTask) -> Result<TaskHandle, ActionError> {
        let (context, command) = task.into_parts();
        let context = Arc::new(context);
        let (id, target) = (context.id, context.target.clone());
        let shared = &self.shared;

        let registered = shared
            .registry
            .register(Arc::clone(&context), command.describe());
        let (state_rx, cancel) = match registered {
            Ok(registered) => registered,
            Err(e) => {
                tracing::info!(target_key = %target, "Rejected duplicate action");
                return Err(e);
            }
        };

        shared.notify(&context, NotificationKind::Start, None);
        shared
            .registry
            .transition(&target, id, TaskState::CancelWindowOpen)?;

        tracing::info!(
            task_id = %id,
            target_key = %target,
            grace_ms = shared.grace_period.as_millis() as u64,
            "Action submitted"
        );

        tokio::spawn(Arc::clone(shared).drive(context, command, cancel));
        Ok(TaskHandle::new(id, target, state_rx))
    }

    /// Cancel a task inside its grace window.
    ///
    /// Returns `true` if this call cancelled the task, in which case the task
    /// is `Cancelled` and its cancel notification and navigation have been
    /// delivered by the time it returns. Returns `false` once the window has
    /// closed or the task was already cancelled.
    pub fn cancel(&self, handle: &TaskHandle) -> bool {
        match self
            .shared
            .registry
            .request_cancel(handle.target(), handle.id())
        {
            Some(context) => {
                self.shared.conclude(&context, TaskState::Cancelled, None);
                true
            }
            None => {
                tracing::debug!(task_id = %handle.id(), "Cancel ignored");
                false
            }
        }
    }

    /// Cancel every task still inside its grace window. Returns how many were
    /// cancelled. Running tasks are left to finish.
    pub fn cancel_all(&self) -> usize {
        let shared = &self.shared;
        let mut cancelled = 0;
        for (target, id) in shared.registry.open_windows() {
            if let Some(context) = shared.registry.request_cancel(&target, id) {
                shared.conclude(&context, TaskState::Cancelled, None);
                cancelled += 1;
            }
        }
        cancelled
    }

    /// State of a task by id, from the active set or recent history.
    pub fn status(&self, id: Uuid) -> Option<TaskState> {
        self.shared.registry.status(id)
    }

    pub fn is_active(&self, target: &TargetKey) -> bool {
        self.shared.registry.is_active(target)
    }

    pub fn active_count(&self) -> usize {
        self.shared.registry.active_count()
    }

    /// Finished tasks, oldest first, bounded by the configured history limit.
    pub fn history(&self) -> Vec<TaskRecord> {
        self.shared.registry.history()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.shared.registry.subscribe()
    }
}

impl Shared {
    async fn drive(
        self: Arc<Self>,
        context: Arc<TaskContext>,
        command: Box<dyn ActionCommand>,
        cancel: Arc<Notify>,
    ) {
        let cancelled = tokio::select! {
            _ = tokio::time::sleep(self.grace_period) => false,
            _ = cancel.notified() => true,
        };
        if cancelled {
            return;
        }

        match self.registry.close_window(&context.target, context.id) {
            Ok(WindowOutcome::Run) => {
                tracing::info!(
                    task_id = %context.id,
                    target_key = %context.target,
                    "Action running"
                );
                match run_contained(command).await {
                    Ok(()) => self.conclude(&context, TaskState::Succeeded, None),
                    Err(detail) => self.conclude(&context, TaskState::Failed, Some(detail)),
                }
            }
            // A cancel landed between the timer firing and the lock.
            Ok(WindowOutcome::Cancel) => {}
            Err(e) => {
                tracing::debug!(
                    task_id = %context.id,
                    error = %e,
                    "Grace window closed on finished task"
                );
            }
        }
    }

    /// Notify, commit the terminal state, then navigate.
    fn conclude(&self, context: &TaskContext, to: TaskState, error: Option<String>) {
        let kind = match to {
            TaskState::Cancelled => NotificationKind::Cancel,
            TaskState::Succeeded => NotificationKind::Success,
            _ => NotificationKind::Error,
        };
        self.notify(context, kind, error.clone());

        if let Err(e) = self
            .registry
            .finish(&context.target, context.id, to, error.clone())
        {
            tracing::error!(task_id = %context.id, error = %e, "Failed to commit terminal state");
            return;
        }

        match &error {
            Some(detail) => tracing::warn!(
                task_id = %context.id,
                target_key = %context.target,
                state = %to,
                error = %detail,
                "Action finished"
            ),
            None => tracing::info!(
                task_id = %context.id,
                target_key = %context.target,
                state = %to,
                "Action finished"
            ),
        }

        if let Some(destination) = context.navigation.for_state(to) {
            self.navigator.navigate(context.id, destination);
        }
    }

    fn notify(&self, context: &TaskContext, kind: NotificationKind, detail: Option<String>) {
        let notification = Notification {
            task_id: context.id,
            kind,
            text: context.messages.for_kind(kind).render(&context.display_name),
            target: context.target.clone(),
            detail,
        };
        if let Err(e) = self.sink.notify(&notification) {
            tracing::warn!(task_id = %context.id, kind = %kind, error = %e, "Notification dropped");
        }
    }
}

/// Run a command on its own Tokio task. A panic comes back as an error
/// message instead of unwinding through the driver.
async fn run_contained(command: Box<dyn ActionCommand>) -> Result<(), String> {
    match tokio::spawn(command.execute()).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) if e.is_panic() => {
            tracing::error!(error = %e, "Action command panicked");
            Err("Action panicked before completing".to_string())
        }
        Err(e) => Err(format!("Action aborted: {}", e)),
    }
}
