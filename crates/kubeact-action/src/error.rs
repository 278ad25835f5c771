//! Error types for the action engine.

use crate::types::{Intent, TaskState};
use kubeact_core::error::CoreError;
use kubeact_core::types::{TargetKey, WorkloadKind};
use uuid::Uuid;

/// Errors from building a mutated resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("{kind} does not support {intent}")]
    UnsupportedIntent { kind: WorkloadKind, intent: Intent },
    #[error("{0} has no pod template")]
    MissingPodTemplate(WorkloadKind),
    #[error("Invalid resource: {0}")]
    InvalidResource(String),
}

/// Errors from task lifecycle management.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(Uuid),
    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(TaskState, TaskState),
}

/// Failure reported by the remote apply call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("Rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Apply failed: {0}")]
    Other(String),
}

/// A notification sink could not deliver a message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Notification delivery failed: {0}")]
pub struct SinkError(pub String);

/// A telemetry event could not be emitted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Telemetry emit failed: {0}")]
pub struct TelemetryError(pub String);

/// The authorization check itself could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Authorization check failed: {0}")]
pub struct AuthCheckError(pub String);

/// Errors surfaced to callers of the action engine.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{kind} does not support {intent}")]
    UnsupportedIntent { kind: WorkloadKind, intent: Intent },
    #[error("An action is already in progress for {0}")]
    DuplicateActiveAction(TargetKey),
    #[error("Not authorized to {verb} {target}")]
    AuthorizationDenied { target: TargetKey, verb: String },
    #[error("Authorization check failed for {target}: {reason}")]
    AuthorizationUnknown { target: TargetKey, reason: String },
    #[error("Remote apply failed: {0}")]
    RemoteApplyFailed(#[from] ApplyError),
    #[error("Mutation failed: {0}")]
    Mutation(MutationError),
    #[error("Task error: {0}")]
    Task(#[from] TaskError),
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<MutationError> for ActionError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::UnsupportedIntent { kind, intent } => {
                ActionError::UnsupportedIntent { kind, intent }
            }
            other => ActionError::Mutation(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubeact_core::types::ResourceRef;

    #[test]
    fn test_mutation_error_display() {
        let err = MutationError::UnsupportedIntent {
            kind: WorkloadKind::ReplicaSet,
            intent: Intent::Restart,
        };
        assert_eq!(err.to_string(), "ReplicaSet does not support restart");

        let err = MutationError::MissingPodTemplate(WorkloadKind::Deployment);
        assert_eq!(err.to_string(), "Deployment has no pod template");
    }

    #[test]
    fn test_task_error_display() {
        let id = Uuid::new_v4();
        let err = TaskError::NotFound(id);
        assert_eq!(err.to_string(), format!("Task not found: {}", id));

        let err = TaskError::InvalidTransition(TaskState::Succeeded, TaskState::Running);
        assert_eq!(
            err.to_string(),
            "Invalid state transition: succeeded -> running"
        );
    }

    #[test]
    fn test_apply_error_display() {
        let err = ApplyError::Rejected {
            status: 409,
            message: "conflict".to_string(),
        };
        assert_eq!(err.to_string(), "Rejected by server (409): conflict");
        assert_eq!(
            ApplyError::Network("connection reset".into()).to_string(),
            "Network error: connection reset"
        );
    }

    #[test]
    fn test_unsupported_intent_lifts_to_action_error() {
        let err: ActionError = MutationError::UnsupportedIntent {
            kind: WorkloadKind::Job,
            intent: Intent::Restart,
        }
        .into();
        assert!(matches!(
            err,
            ActionError::UnsupportedIntent {
                kind: WorkloadKind::Job,
                intent: Intent::Restart
            }
        ));
    }

    #[test]
    fn test_other_mutation_errors_stay_wrapped() {
        let err: ActionError = MutationError::InvalidResource("spec".into()).into();
        assert!(matches!(err, ActionError::Mutation(_)));
    }

    #[test]
    fn test_duplicate_action_display() {
        let key = ResourceRef::new(WorkloadKind::Deployment, Some("default".into()), "web")
            .target_key();
        let err = ActionError::DuplicateActiveAction(key);
        assert_eq!(
            err.to_string(),
            "An action is already in progress for Deployment/default/web"
        );
    }

    #[test]
    fn test_apply_error_converts() {
        let err: ActionError = ApplyError::Unauthorized("forbidden".into()).into();
        assert!(matches!(err, ActionError::RemoteApplyFailed(_)));
        assert!(err.to_string().contains("forbidden"));
    }
}
