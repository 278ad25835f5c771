//! Fire-and-forget product telemetry.

use kubeact_core::types::ResourceRef;
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;

/// Status attached to a telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Confirmed,
}

/// A user-facing action event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event_type: String,
    pub resource: ResourceRef,
    pub status: EventStatus,
}

impl TelemetryEvent {
    pub const RESTART_RESOURCE: &'static str = "restart_resource";

    pub fn restart_confirmed(resource: ResourceRef) -> Self {
        Self {
            event_type: Self::RESTART_RESOURCE.to_string(),
            resource,
            status: EventStatus::Confirmed,
        }
    }
}

pub trait TelemetryEmitter: Send + Sync {
    fn emit(&self, event: TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Emitter that records events in the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEmitter;

impl TelemetryEmitter for TracingEmitter {
    fn emit(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        let payload = serde_json::to_string(&event).map_err(|e| TelemetryError(e.to_string()))?;
        tracing::info!(event_type = %event.event_type, payload = %payload, "Telemetry");
        Ok(())
    }
}

/// Emit an event, logging and discarding any failure.
pub fn emit_quietly(emitter: &dyn TelemetryEmitter, event: TelemetryEvent) {
    let event_type = event.event_type.clone();
    if let Err(e) = emitter.emit(event) {
        tracing::warn!(event_type = %event_type, error = %e, "Telemetry emit failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubeact_core::types::WorkloadKind;
    use std::sync::Mutex;

    struct Failing;

    impl TelemetryEmitter for Failing {
        fn emit(&self, _event: TelemetryEvent) -> Result<(), TelemetryError> {
            Err(TelemetryError("collector down".to_string()))
        }
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<TelemetryEvent>>);

    impl TelemetryEmitter for Recording {
        fn emit(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn web() -> ResourceRef {
        ResourceRef::new(WorkloadKind::Deployment, Some("default".into()), "web")
    }

    #[test]
    fn test_restart_confirmed_event() {
        let event = TelemetryEvent::restart_confirmed(web());
        assert_eq!(event.event_type, "restart_resource");
        assert_eq!(event.status, EventStatus::Confirmed);
        assert_eq!(event.resource.name, "web");
    }

    #[test]
    fn test_emit_quietly_swallows_failure() {
        emit_quietly(&Failing, TelemetryEvent::restart_confirmed(web()));
    }

    #[test]
    fn test_tracing_emitter_serializes() {
        assert!(TracingEmitter
            .emit(TelemetryEvent::restart_confirmed(web()))
            .is_ok());
        let json = serde_json::to_value(TelemetryEvent::restart_confirmed(web())).unwrap();
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["resource"]["name"], "web");
    }

    #[test]
    fn test_emit_quietly_delivers() {
        let rec = Recording::default();
        emit_quietly(&rec, TelemetryEvent::restart_confirmed(web()));
        assert_eq!(rec.0.lock().unwrap().len(), 1);
    }
}
