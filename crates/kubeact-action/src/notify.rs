//! Outbound collaborators driven by the scheduler: the notification sink and
//! the navigator.

use kubeact_core::types::TargetKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SinkError;
use crate::types::NotificationKind;

/// Structured payload handed to a [`NotificationSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub task_id: Uuid,
    pub kind: NotificationKind,
    pub text: String,
    pub target: TargetKey,
    /// Failure detail, only set on error notifications.
    pub detail: Option<String>,
}

/// Renders lifecycle messages to the user.
///
/// Called synchronously at each transition. Errors are logged by the caller
/// and never reach the state machine.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), SinkError>;
}

/// Guides the user to a location after a task ends.
pub trait Navigator: Send + Sync {
    fn navigate(&self, task_id: Uuid, destination: &str);
}

/// Sink that writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, n: &Notification) -> Result<(), SinkError> {
        match n.kind {
            NotificationKind::Error => tracing::warn!(
                task_id = %n.task_id,
                target = %n.target,
                detail = n.detail.as_deref().unwrap_or(""),
                "{}",
                n.text
            ),
            _ => tracing::info!(
                task_id = %n.task_id,
                target = %n.target,
                kind = %n.kind,
                "{}",
                n.text
            ),
        }
        Ok(())
    }
}

/// Navigator that only records the destination in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, task_id: Uuid, destination: &str) {
        tracing::debug!(task_id = %task_id, destination, "Navigation requested");
    }
}
