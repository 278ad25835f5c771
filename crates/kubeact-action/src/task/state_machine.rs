//! Task state machine with validated transitions.
//!
//! Enforces the allowed state transitions for task lifecycle:
//! Pending -> CancelWindowOpen -> Cancelled | Running
//! Running -> Succeeded | Failed

use crate::error::TaskError;
use crate::types::TaskState;

/// Validate that a state transition is allowed.
pub fn validate_transition(from: TaskState, to: TaskState) -> Result<(), TaskError> {
    let valid = matches!(
        (from, to),
        (TaskState::Pending, TaskState::CancelWindowOpen)
            | (TaskState::CancelWindowOpen, TaskState::Cancelled)
            | (TaskState::CancelWindowOpen, TaskState::Running)
            | (TaskState::Running, TaskState::Succeeded)
            | (TaskState::Running, TaskState::Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(TaskError::InvalidTransition(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_to_cancel_window() {
        assert!(validate_transition(TaskState::Pending, TaskState::CancelWindowOpen).is_ok());
    }

    #[test]
    fn test_cancel_window_to_cancelled() {
        assert!(validate_transition(TaskState::CancelWindowOpen, TaskState::Cancelled).is_ok());
    }

    #[test]
    fn test_cancel_window_to_running() {
        assert!(validate_transition(TaskState::CancelWindowOpen, TaskState::Running).is_ok());
    }

    #[test]
    fn test_running_outcomes() {
        assert!(validate_transition(TaskState::Running, TaskState::Succeeded).is_ok());
        assert!(validate_transition(TaskState::Running, TaskState::Failed).is_ok());
    }

    #[test]
    fn test_pending_cannot_skip_window() {
        assert!(validate_transition(TaskState::Pending, TaskState::Running).is_err());
        assert!(validate_transition(TaskState::Pending, TaskState::Cancelled).is_err());
    }

    #[test]
    fn test_running_cannot_be_cancelled() {
        assert!(validate_transition(TaskState::Running, TaskState::Cancelled).is_err());
    }

    #[test]
    fn test_cancel_window_cannot_finish_directly() {
        assert!(validate_transition(TaskState::CancelWindowOpen, TaskState::Succeeded).is_err());
        assert!(validate_transition(TaskState::CancelWindowOpen, TaskState::Failed).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in [TaskState::Succeeded, TaskState::Failed, TaskState::Cancelled] {
            for to in TaskState::ALL {
                assert!(
                    validate_transition(from, to).is_err(),
                    "{} -> {} should be rejected",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_invalid_transition_error_message() {
        let err = validate_transition(TaskState::Failed, TaskState::Running).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("failed"), "Error should mention source state");
        assert!(msg.contains("running"), "Error should mention target state");
    }

    #[test]
    fn test_all_valid_transitions_count() {
        let mut valid_count = 0;
        for from in TaskState::ALL {
            for to in TaskState::ALL {
                if validate_transition(from, to).is_ok() {
                    valid_count += 1;
                }
            }
        }
        assert_eq!(valid_count, 5, "Expected exactly 5 valid transitions");
    }
}
