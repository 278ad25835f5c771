//! User confirmation before an action is created.
//!
//! A [`ConfirmationGate`] resolves to `true` only on explicit approval.
//! Dismissing a prompt, or dropping it unanswered, counts as a decline.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kubeact_core::types::{ResourceRef, Timestamp};
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::types::Intent;

/// A question put to the user about one intended action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationPrompt {
    pub id: Uuid,
    pub target: ResourceRef,
    pub display_name: String,
    pub intent: Intent,
    pub created_at: Timestamp,
}

impl ConfirmationPrompt {
    pub fn new(target: ResourceRef, display_name: impl Into<String>, intent: Intent) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            display_name: display_name.into(),
            intent,
            created_at: Timestamp::now(),
        }
    }

    pub fn question(&self) -> String {
        format!(
            "Are you sure you want to {} {}?",
            self.intent, self.display_name
        )
    }
}

#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Ask the user. `true` means explicitly approved.
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool;
}

/// Approves everything. For non-interactive use.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationGate for AutoConfirm {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool {
        tracing::debug!(prompt_id = %prompt.id, target = %prompt.target, "Auto-confirmed");
        true
    }
}

struct PendingConfirmation {
    prompt: ConfirmationPrompt,
    reply: oneshot::Sender<bool>,
}

/// Gate backed by a queue of open prompts, answered out of band with
/// [`approve`](Self::approve) or [`dismiss`](Self::dismiss).
#[derive(Default)]
pub struct ConfirmationQueue {
    pending: Mutex<VecDeque<PendingConfirmation>>,
}

impl ConfirmationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingConfirmation>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, id: Uuid) -> Option<PendingConfirmation> {
        let mut pending = self.lock();
        let pos = pending.iter().position(|p| p.prompt.id == id)?;
        pending.remove(pos)
    }

    /// Approve an open prompt. Returns `false` if no such prompt is waiting.
    pub fn approve(&self, id: Uuid) -> bool {
        self.answer(id, true)
    }

    /// Decline an open prompt. Returns `false` if no such prompt is waiting.
    pub fn dismiss(&self, id: Uuid) -> bool {
        self.answer(id, false)
    }

    fn answer(&self, id: Uuid, approved: bool) -> bool {
        match self.take(id) {
            // The asker may have given up; that is not an error here.
            Some(p) => {
                let _ = p.reply.send(approved);
                tracing::debug!(prompt_id = %id, approved, "Confirmation answered");
                true
            }
            None => false,
        }
    }

    /// Open prompts, oldest first.
    pub fn pending(&self) -> Vec<ConfirmationPrompt> {
        self.lock().iter().map(|p| p.prompt.clone()).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}

/// Withdraws a prompt when its asker stops waiting.
struct Withdraw<'a> {
    queue: &'a ConfirmationQueue,
    id: Uuid,
}

impl Drop for Withdraw<'_> {
    fn drop(&mut self) {
        if self.queue.take(self.id).is_some() {
            tracing::debug!(prompt_id = %self.id, "Confirmation withdrawn");
        }
    }
}

#[async_trait]
impl ConfirmationGate for ConfirmationQueue {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool {
        let (reply, answer) = oneshot::channel();
        self.lock().push_back(PendingConfirmation {
            prompt: prompt.clone(),
            reply,
        });
        let _withdraw = Withdraw {
            queue: self,
            id: prompt.id,
        };
        tracing::debug!(prompt_id = %prompt.id, "Awaiting confirmation");
        // A dropped sender means the prompt went away unanswered.
        answer.await.unwrap_or(false)
    }
}

impl std::fmt::Debug for ConfirmationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationQueue")
            .field("pending", &self.pending_count())
            .finish()
    }
}
