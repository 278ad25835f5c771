use kubeact_core::types::{TargetKey, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::TaskState;

/// A state change of one task, broadcast to scheduler subscribers.
///
/// `from` is `None` for the initial `Pending` registration. Per task, events
/// arrive in transition order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub task_id: Uuid,
    pub target: TargetKey,
    pub from: Option<TaskState>,
    pub to: TaskState,
    pub at: Timestamp,
}

impl LifecycleEvent {
    pub fn new(task_id: Uuid, target: TargetKey, from: Option<TaskState>, to: TaskState) -> Self {
        Self {
            task_id,
            target,
            from,
            to,
            at: Timestamp::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.to.is_terminal()
    }
}
