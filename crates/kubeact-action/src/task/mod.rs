//! Action tasks: the unit of tracked work handed to the scheduler.
//!
//! A task owns its command exclusively. Commands consume themselves when
//! executed, so a task's mutation can run at most once.

pub mod state_machine;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use kubeact_core::types::TargetKey;
use tokio::sync::watch;
use uuid::Uuid;

use crate::apply::RemoteApply;
use crate::error::ApplyError;
use crate::mutation::MutatedResource;
use crate::types::{Navigation, TaskMessages, TaskState};

/// The deferred operation a task performs once its grace window closes.
#[async_trait]
pub trait ActionCommand: Send {
    /// Short human-readable description, used in logs and history.
    fn describe(&self) -> String;

    async fn execute(self: Box<Self>) -> Result<(), ApplyError>;
}

/// Submits a prepared manifest through a [`RemoteApply`].
///
/// Captures only the manifest snapshot and the apply capability.
pub struct ApplyCommand {
    mutated: MutatedResource,
    remote: Arc<dyn RemoteApply>,
}

impl ApplyCommand {
    pub fn new(mutated: MutatedResource, remote: Arc<dyn RemoteApply>) -> Self {
        Self { mutated, remote }
    }
}

#[async_trait]
impl ActionCommand for ApplyCommand {
    fn describe(&self) -> String {
        format!("{} {}", self.mutated.intent, self.mutated.target)
    }

    async fn execute(self: Box<Self>) -> Result<(), ApplyError> {
        self.remote.apply(&self.mutated.manifest).await
    }
}

/// Wraps a one-shot async closure as a command.
pub struct FnCommand<F> {
    description: String,
    f: F,
}

/// Build a command from a closure returning a future.
pub fn command_fn<F, Fut>(description: impl Into<String>, f: F) -> FnCommand<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ApplyError>> + Send + 'static,
{
    FnCommand {
        description: description.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> ActionCommand for FnCommand<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ApplyError>> + Send + 'static,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn execute(self: Box<Self>) -> Result<(), ApplyError> {
        let this = *self;
        (this.f)().await
    }
}

/// One user-confirmed action, not yet submitted.
pub struct ActionTask {
    pub id: Uuid,
    pub target: TargetKey,
    /// Substituted for `{name}` in the lifecycle messages.
    pub display_name: String,
    pub messages: TaskMessages,
    pub navigation: Navigation,
    pub(crate) command: Box<dyn ActionCommand>,
}

impl std::fmt::Debug for ActionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionTask")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("display_name", &self.display_name)
            .field("command", &self.command.describe())
            .finish()
    }
}

impl ActionTask {
    /// Create a task with neutral wording and no navigation targets.
    pub fn new(
        target: TargetKey,
        display_name: impl Into<String>,
        command: Box<dyn ActionCommand>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            display_name: display_name.into(),
            messages: TaskMessages::default(),
            navigation: Navigation::default(),
            command,
        }
    }

    pub fn with_messages(mut self, messages: TaskMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_navigation(mut self, navigation: Navigation) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn describe(&self) -> String {
        self.command.describe()
    }

    pub(crate) fn into_parts(self) -> (TaskContext, Box<dyn ActionCommand>) {
        let context = TaskContext {
            id: self.id,
            target: self.target,
            display_name: self.display_name,
            messages: self.messages,
            navigation: self.navigation,
        };
        (context, self.command)
    }
}

/// A submitted task without its command.
#[derive(Debug)]
pub(crate) struct TaskContext {
    pub id: Uuid,
    pub target: TargetKey,
    pub display_name: String,
    pub messages: TaskMessages,
    pub navigation: Navigation,
}

/// Caller-side view of a submitted task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: Uuid,
    target: TargetKey,
    state: watch::Receiver<TaskState>,
}

impl TaskHandle {
    pub(crate) fn new(id: Uuid, target: TargetKey, state: watch::Receiver<TaskState>) -> Self {
        Self { id, target, state }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &TargetKey {
        &self.target
    }

    /// The most recently published state.
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Wait until the task reaches a terminal state and return it.
    pub async fn finished(&self) -> TaskState {
        let mut rx = self.state.clone();
        if let Ok(state) = rx.wait_for(TaskState::is_terminal).await {
            return *state;
        }
        // Sender gone without a terminal state; report the last one seen.
        let last = *rx.borrow();
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::MutationBuilder;
    use crate::types::Intent;
    use kubeact_core::resource::WorkloadResource;
    use kubeact_core::types::{ResourceRef, WorkloadKind};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingApply(Mutex<Vec<Value>>);

    #[async_trait]
    impl RemoteApply for CapturingApply {
        async fn apply(&self, manifest: &Value) -> Result<(), ApplyError> {
            self.0.lock().unwrap().push(manifest.clone());
            Ok(())
        }
    }

    fn key() -> TargetKey {
        ResourceRef::new(WorkloadKind::Deployment, Some("default".into()), "web").target_key()
    }

    #[tokio::test]
    async fn test_apply_command_submits_manifest() {
        let resource = WorkloadResource::from_value(json!({
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {"template": {}}
        }))
        .unwrap();
        let mutated = MutationBuilder::new().build(&resource, Intent::Restart).unwrap();
        let remote = Arc::new(CapturingApply::default());
        let cmd = ApplyCommand::new(mutated.clone(), remote.clone());

        assert_eq!(cmd.describe(), "restart Deployment default/web");
        Box::new(cmd).execute().await.unwrap();

        let applied = remote.0.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0], mutated.manifest);
    }

    #[tokio::test]
    async fn test_fn_command_runs_closure() {
        let cmd = command_fn("fail", || async {
            Err(ApplyError::Network("down".to_string()))
        });
        assert_eq!(cmd.describe(), "fail");
        let err = Box::new(cmd).execute().await.unwrap_err();
        assert_eq!(err, ApplyError::Network("down".to_string()));
    }

    #[test]
    fn test_task_defaults() {
        let command = command_fn("noop", || async { Ok(()) });
        let task = ActionTask::new(key(), "web", Box::new(command));
        assert_eq!(task.display_name, "web");
        assert_eq!(task.messages, TaskMessages::default());
        assert_eq!(task.navigation, Navigation::default());
        assert_eq!(task.describe(), "noop");
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = ActionTask::new(key(), "web", Box::new(command_fn("a", || async { Ok(()) })));
        let b = ActionTask::new(key(), "web", Box::new(command_fn("b", || async { Ok(()) })));
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_handle_finished_waits_for_terminal() {
        let (tx, rx) = watch::channel(TaskState::CancelWindowOpen);
        let handle = TaskHandle::new(Uuid::new_v4(), key(), rx);
        assert_eq!(handle.state(), TaskState::CancelWindowOpen);

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.finished().await })
        };
        tx.send(TaskState::Running).unwrap();
        tx.send(TaskState::Succeeded).unwrap();
        assert_eq!(waiter.await.unwrap(), TaskState::Succeeded);
        assert_eq!(handle.state(), TaskState::Succeeded);
    }

    #[tokio::test]
    async fn test_handle_finished_after_sender_dropped() {
        let (tx, rx) = watch::channel(TaskState::Running);
        let handle = TaskHandle::new(Uuid::new_v4(), key(), rx);
        drop(tx);
        assert_eq!(handle.finished().await, TaskState::Running);
    }
}
