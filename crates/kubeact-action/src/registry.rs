//! Registry of active tasks, keyed by target.
//!
//! This is the only shared mutable state in the action engine. Every read and
//! write goes through one mutex, so check-then-insert in [`TaskRegistry::register`]
//! and the window-close decision in [`TaskRegistry::close_window`] are atomic
//! with respect to each other and to cancellation. Lifecycle events are
//! broadcast while the lock is held, so per task they arrive in transition
//! order.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kubeact_core::types::{TargetKey, Timestamp};
use tokio::sync::{broadcast, watch, Notify};
use uuid::Uuid;

use crate::error::{ActionError, TaskError};
use crate::events::LifecycleEvent;
use crate::task::state_machine::validate_transition;
use crate::task::TaskContext;
use crate::types::{TaskRecord, TaskState};

/// Outcome of closing a task's grace window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowOutcome {
    /// Cancellation won the race; the canceller finishes the task.
    Cancel,
    /// The task moved to `Running` and its command may execute.
    Run,
}

struct Slot {
    id: Uuid,
    context: Arc<TaskContext>,
    state: TaskState,
    cancel_requested: bool,
    description: String,
    submitted_at: Timestamp,
    state_tx: watch::Sender<TaskState>,
    cancel: Arc<Notify>,
}

#[derive(Default)]
struct RegistryState {
    active: HashMap<TargetKey, Slot>,
    history: VecDeque<TaskRecord>,
}

/// Owned registry of in-flight tasks plus a bounded history of finished ones.
pub struct TaskRegistry {
    state: Mutex<RegistryState>,
    history_limit: usize,
    events: broadcast::Sender<LifecycleEvent>,
}

impl TaskRegistry {
    pub fn new(history_limit: usize, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            state: Mutex::new(RegistryState::default()),
            history_limit,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Called with the state lock held.
    fn publish(&self, id: Uuid, target: &TargetKey, from: Option<TaskState>, to: TaskState) {
        tracing::debug!(task_id = %id, target_key = %target, ?from, to = %to, "Task transition");
        // No subscribers is fine.
        let _ = self
            .events
            .send(LifecycleEvent::new(id, target.clone(), from, to));
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // Slots are plain data; a panic elsewhere cannot leave them half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a task in `Pending`, unless its target already has an active task.
    pub(crate) fn register(
        &self,
        context: Arc<TaskContext>,
        description: String,
    ) -> Result<(watch::Receiver<TaskState>, Arc<Notify>), ActionError> {
        let target = &context.target;
        let mut state = self.lock();
        if state.active.contains_key(target) {
            return Err(ActionError::DuplicateActiveAction(target.clone()));
        }

        let (state_tx, state_rx) = watch::channel(TaskState::Pending);
        let cancel = Arc::new(Notify::new());
        state.active.insert(
            target.clone(),
            Slot {
                id: context.id,
                context: Arc::clone(&context),
                state: TaskState::Pending,
                cancel_requested: false,
                description,
                submitted_at: Timestamp::now(),
                state_tx,
                cancel: Arc::clone(&cancel),
            },
        );
        self.publish(context.id, target, None, TaskState::Pending);
        Ok((state_rx, cancel))
    }

    /// Apply a non-terminal transition. Returns the previous state.
    pub(crate) fn transition(
        &self,
        target: &TargetKey,
        id: Uuid,
        to: TaskState,
    ) -> Result<TaskState, TaskError> {
        let mut state = self.lock();
        let slot = find_slot(&mut state, target, id)?;
        let from = slot.state;
        validate_transition(from, to)?;
        slot.state = to;
        slot.state_tx.send_replace(to);
        self.publish(id, target, Some(from), to);
        Ok(from)
    }

    /// Record a cancel request. Accepted once, and only while the window is
    /// open; the accepted caller gets the context it needs to finish the task.
    pub(crate) fn request_cancel(&self, target: &TargetKey, id: Uuid) -> Option<Arc<TaskContext>> {
        let mut state = self.lock();
        match state.active.get_mut(target) {
            Some(slot)
                if slot.id == id
                    && slot.state == TaskState::CancelWindowOpen
                    && !slot.cancel_requested =>
            {
                slot.cancel_requested = true;
                slot.cancel.notify_one();
                Some(Arc::clone(&slot.context))
            }
            _ => None,
        }
    }

    /// Decide, atomically with [`request_cancel`](Self::request_cancel), whether
    /// a task whose window just closed is cancelled or starts running.
    pub(crate) fn close_window(
        &self,
        target: &TargetKey,
        id: Uuid,
    ) -> Result<WindowOutcome, TaskError> {
        let mut state = self.lock();
        let slot = find_slot(&mut state, target, id)?;
        if slot.cancel_requested {
            return Ok(WindowOutcome::Cancel);
        }
        let from = slot.state;
        validate_transition(from, TaskState::Running)?;
        slot.state = TaskState::Running;
        slot.state_tx.send_replace(TaskState::Running);
        self.publish(id, target, Some(from), TaskState::Running);
        Ok(WindowOutcome::Run)
    }

    /// Move a task into a terminal state, release its target and archive it.
    pub(crate) fn finish(
        &self,
        target: &TargetKey,
        id: Uuid,
        to: TaskState,
        error_message: Option<String>,
    ) -> Result<TaskRecord, TaskError> {
        let mut state = self.lock();
        let slot = find_slot(&mut state, target, id)?;
        validate_transition(slot.state, to)?;

        let slot = state
            .active
            .remove(target)
            .ok_or(TaskError::NotFound(id))?;
        slot.state_tx.send_replace(to);
        self.publish(id, target, Some(slot.state), to);

        let record = TaskRecord {
            id,
            target: target.clone(),
            description: slot.description,
            state: to,
            error_message,
            submitted_at: slot.submitted_at,
            finished_at: Timestamp::now(),
        };
        if self.history_limit > 0 {
            if state.history.len() == self.history_limit {
                state.history.pop_front();
            }
            state.history.push_back(record.clone());
        }
        Ok(record)
    }

    /// Current state of the active task on `target`, if any.
    pub fn state_of(&self, target: &TargetKey) -> Option<TaskState> {
        self.lock().active.get(target).map(|slot| slot.state)
    }

    /// State of a task by id: active first, then history.
    pub fn status(&self, id: Uuid) -> Option<TaskState> {
        let state = self.lock();
        state
            .active
            .values()
            .find(|slot| slot.id == id)
            .map(|slot| slot.state)
            .or_else(|| {
                state
                    .history
                    .iter()
                    .rev()
                    .find(|r| r.id == id)
                    .map(|r| r.state)
            })
    }

    pub fn is_active(&self, target: &TargetKey) -> bool {
        self.lock().active.contains_key(target)
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    /// Targets and ids of tasks whose window is still open.
    pub(crate) fn open_windows(&self) -> Vec<(TargetKey, Uuid)> {
        self.lock()
            .active
            .iter()
            .filter(|(_, slot)| slot.state == TaskState::CancelWindowOpen)
            .map(|(key, slot)| (key.clone(), slot.id))
            .collect()
    }

    /// Finished tasks, oldest first.
    pub fn history(&self) -> Vec<TaskRecord> {
        self.lock().history.iter().cloned().collect()
    }
}

fn find_slot<'a>(
    state: &'a mut RegistryState,
    target: &TargetKey,
    id: Uuid,
) -> Result<&'a mut Slot, TaskError> {
    state
        .active
        .get_mut(target)
        .filter(|slot| slot.id == id)
        .ok_or(TaskError::NotFound(id))
}
