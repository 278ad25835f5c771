//! Core types and value objects for the action engine.
//!
//! Defines task states, intents, lifecycle messages, navigation targets and
//! the audit record kept for finished tasks.

use kubeact_core::types::{TargetKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    CancelWindowOpen,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    /// Succeeded, Failed and Cancelled admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }

    pub const ALL: [TaskState; 6] = [
        TaskState::Pending,
        TaskState::CancelWindowOpen,
        TaskState::Running,
        TaskState::Succeeded,
        TaskState::Failed,
        TaskState::Cancelled,
    ];
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::CancelWindowOpen => write!(f, "cancel_window_open"),
            TaskState::Running => write!(f, "running"),
            TaskState::Succeeded => write!(f, "succeeded"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskState::Pending),
            "cancel_window_open" => Ok(TaskState::CancelWindowOpen),
            "running" => Ok(TaskState::Running),
            "succeeded" => Ok(TaskState::Succeeded),
            "failed" => Ok(TaskState::Failed),
            "cancelled" => Ok(TaskState::Cancelled),
            _ => Err(format!("Unknown task state: {}", s)),
        }
    }
}

/// Mutations a user can request against a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Restart,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Restart => write!(f, "restart"),
        }
    }
}

impl std::str::FromStr for Intent {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restart" => Ok(Intent::Restart),
            _ => Err(format!("Unknown intent: {}", s)),
        }
    }
}

/// Which lifecycle message a notification carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Start,
    Cancel,
    Success,
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Start => write!(f, "start"),
            NotificationKind::Cancel => write!(f, "cancel"),
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Messages and navigation
// =============================================================================

/// A message with an optional `{name}` placeholder for the target's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTemplate(pub String);

impl MessageTemplate {
    pub const NAME_PLACEHOLDER: &'static str = "{name}";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn render(&self, display_name: &str) -> String {
        self.0.replace(Self::NAME_PLACEHOLDER, display_name)
    }
}

/// The four lifecycle messages of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessages {
    pub start: MessageTemplate,
    pub cancelled: MessageTemplate,
    pub success: MessageTemplate,
    pub error: MessageTemplate,
}

impl Default for TaskMessages {
    /// Neutral wording for callers that bring no messages of their own.
    fn default() -> Self {
        Self {
            start: MessageTemplate::new("Working on {name}…"),
            cancelled: MessageTemplate::new("Cancelled action on {name}."),
            success: MessageTemplate::new("Finished action on {name}."),
            error: MessageTemplate::new("Action on {name} failed."),
        }
    }
}

impl TaskMessages {
    /// Default wording for the restart action.
    pub fn restart() -> Self {
        Self {
            start: MessageTemplate::new("Restarting {name}…"),
            cancelled: MessageTemplate::new("Cancelled restarting {name}."),
            success: MessageTemplate::new("Restarted {name}."),
            error: MessageTemplate::new("Failed to restart {name}."),
        }
    }

    pub fn for_kind(&self, kind: NotificationKind) -> &MessageTemplate {
        match kind {
            NotificationKind::Start => &self.start,
            NotificationKind::Cancel => &self.cancelled,
            NotificationKind::Success => &self.success,
            NotificationKind::Error => &self.error,
        }
    }
}

/// Where the caller should be taken once a task ends. Locations are opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub on_success: Option<String>,
    pub on_cancel: Option<String>,
    pub on_error: Option<String>,
}

impl Navigation {
    /// Destination for a terminal state, if one was given.
    pub fn for_state(&self, state: TaskState) -> Option<&str> {
        match state {
            TaskState::Succeeded => self.on_success.as_deref(),
            TaskState::Cancelled => self.on_cancel.as_deref(),
            TaskState::Failed => self.on_error.as_deref(),
            _ => None,
        }
    }
}

// =============================================================================
// History
// =============================================================================

/// Audit record of a finished task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub target: TargetKey,
    pub description: String,
    pub state: TaskState,
    pub error_message: Option<String>,
    pub submitted_at: Timestamp,
    pub finished_at: Timestamp,
}
