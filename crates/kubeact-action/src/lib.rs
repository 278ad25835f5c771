//! Cluster action engine for kubeact.
//!
//! Builds mutated workload manifests, runs them as tasks with a cancel grace
//! window, deduplicates concurrent actions per target and reports every
//! lifecycle transition to pluggable collaborators.

pub mod apply;
pub mod authorization;
pub mod confirmation;
pub mod error;
pub mod events;
pub mod mutation;
pub mod notify;
pub mod registry;
pub mod restart;
pub mod scheduler;
pub mod task;
pub mod telemetry;
pub mod types;

pub use apply::RemoteApply;
pub use authorization::{AllowAll, AuthDecision, AuthorizationGate, EntryPointGuard};
pub use confirmation::{AutoConfirm, ConfirmationGate, ConfirmationPrompt, ConfirmationQueue};
pub use error::{
    ActionError, ApplyError, AuthCheckError, MutationError, SinkError, TaskError, TelemetryError,
};
pub use events::LifecycleEvent;
pub use mutation::{MutatedResource, MutationBuilder};
pub use notify::{Navigator, NoopNavigator, Notification, NotificationSink, TracingSink};
pub use registry::TaskRegistry;
pub use restart::{RequestOutcome, RestartAction};
pub use scheduler::ActionScheduler;
pub use task::{command_fn, ActionCommand, ActionTask, ApplyCommand, TaskHandle};
pub use telemetry::{TelemetryEmitter, TelemetryEvent, TracingEmitter};
pub use types::{Intent, Navigation, NotificationKind, TaskMessages, TaskRecord, TaskState};
