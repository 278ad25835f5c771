//! Whether an action entry point is offered for a resource.
//!
//! The guard fails closed: a check that cannot complete hides the entry point,
//! is reported to the caller's error handler and is retried on the next call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kubeact_core::resource::WorkloadResource;
use kubeact_core::types::{ResourceRef, TargetKey, Verb};

use crate::error::{ActionError, AuthCheckError};
use crate::mutation::supports;
use crate::types::Intent;

/// Capability to ask the cluster whether the current user may act on a resource.
#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    async fn can_perform(
        &self,
        resource: &ResourceRef,
        verb: Verb,
    ) -> Result<bool, AuthCheckError>;
}

/// Gate that allows everything, for local and offline use.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl AuthorizationGate for AllowAll {
    async fn can_perform(
        &self,
        _resource: &ResourceRef,
        _verb: Verb,
    ) -> Result<bool, AuthCheckError> {
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Denied,
    /// The check failed; treated as denied.
    Unknown(String),
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allowed)
    }
}

/// Called when an authorization check cannot be completed.
pub type AuthErrorHandler = Box<dyn Fn(&ResourceRef, &AuthCheckError) + Send + Sync>;

type CacheKey = (TargetKey, Option<String>);

/// Decides entry-point visibility, caching per resource version.
pub struct EntryPointGuard {
    gate: Arc<dyn AuthorizationGate>,
    verb: Verb,
    on_error: AuthErrorHandler,
    decisions: Mutex<HashMap<CacheKey, bool>>,
}

impl EntryPointGuard {
    pub fn new(gate: Arc<dyn AuthorizationGate>, verb: Verb, on_error: AuthErrorHandler) -> Self {
        Self {
            gate,
            verb,
            on_error,
            decisions: Mutex::new(HashMap::new()),
        }
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<CacheKey, bool>> {
        self.decisions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Authorization decision for `resource`. Definite answers are cached until
    /// the resource version changes; failures are not.
    pub async fn decide(&self, resource: &WorkloadResource) -> AuthDecision {
        let reference = resource.resource_ref();
        let key = (
            reference.target_key(),
            resource.resource_version().map(str::to_string),
        );
        let cached = self.cache().get(&key).copied();
        if let Some(allowed) = cached {
            return if allowed {
                AuthDecision::Allowed
            } else {
                AuthDecision::Denied
            };
        }

        match self.gate.can_perform(&reference, self.verb).await {
            Ok(allowed) => {
                let mut cache = self.cache();
                // A newer version supersedes any older decision for the target.
                cache.retain(|(target, _), _| *target != key.0);
                cache.insert(key, allowed);
                if allowed {
                    AuthDecision::Allowed
                } else {
                    AuthDecision::Denied
                }
            }
            Err(e) => {
                tracing::warn!(
                    target = %reference,
                    verb = %self.verb,
                    error = %e,
                    "Authorization check failed"
                );
                (self.on_error)(&reference, &e);
                AuthDecision::Unknown(e.0)
            }
        }
    }

    /// Whether the entry point for `intent` should be offered at all.
    pub async fn is_visible(&self, resource: &WorkloadResource, intent: Intent) -> bool {
        supports(&resource.kind(), intent) && self.decide(resource).await.is_allowed()
    }

    /// Like [`decide`](Self::decide), as a `Result` for callers that proceed.
    pub async fn authorize(&self, resource: &WorkloadResource) -> Result<(), ActionError> {
        let target = resource.resource_ref().target_key();
        match self.decide(resource).await {
            AuthDecision::Allowed => Ok(()),
            AuthDecision::Denied => Err(ActionError::AuthorizationDenied {
                target,
                verb: self.verb.to_string(),
            }),
            AuthDecision::Unknown(reason) => {
                Err(ActionError::AuthorizationUnknown { target, reason })
            }
        }
    }
}

impl std::fmt::Debug for EntryPointGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPointGuard")
            .field("verb", &self.verb)
            .field("cached", &self.cache().len())
            .finish()
    }
}
