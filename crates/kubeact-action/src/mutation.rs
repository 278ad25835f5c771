//! Builds mutated copies of workload manifests for a requested intent.
//!
//! Which kinds support which intent is decided once, by [`supports`], from a
//! fixed capability table. The input manifest is never modified.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use kubeact_core::config::DEFAULT_RESTART_ANNOTATION;
use kubeact_core::resource::WorkloadResource;
use kubeact_core::types::{ResourceRef, Timestamp, WorkloadKind};
use serde_json::{Map, Value};

use crate::error::MutationError;
use crate::types::Intent;

/// Kinds with a pod template and rolling-update semantics.
const RESTARTABLE_KINDS: &[WorkloadKind] = &[
    WorkloadKind::Deployment,
    WorkloadKind::StatefulSet,
    WorkloadKind::DaemonSet,
];

/// Whether `kind` supports `intent`.
pub fn supports(kind: &WorkloadKind, intent: Intent) -> bool {
    match intent {
        Intent::Restart => RESTARTABLE_KINDS.contains(kind),
    }
}

/// Source of the current instant.
pub type ClockFn = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A manifest ready to be submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct MutatedResource {
    pub target: ResourceRef,
    pub intent: Intent,
    /// The instant written into the manifest.
    pub stamped_at: Timestamp,
    pub manifest: Value,
}

/// Produces mutated manifests.
///
/// Restart stamps are strictly increasing per builder: if the clock has not
/// moved past the previous stamp, the next one is the previous plus 1ms.
pub struct MutationBuilder {
    annotation_key: String,
    clock: ClockFn,
    last_stamp: Mutex<Option<Timestamp>>,
}

impl Default for MutationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MutationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationBuilder")
            .field("annotation_key", &self.annotation_key)
            .field("last_stamp", &self.last_stamp)
            .finish()
    }
}

impl MutationBuilder {
    pub fn new() -> Self {
        Self::with_clock(Box::new(Utc::now))
    }

    /// Use a custom clock (tests, replays).
    pub fn with_clock(clock: ClockFn) -> Self {
        Self {
            annotation_key: DEFAULT_RESTART_ANNOTATION.to_string(),
            clock,
            last_stamp: Mutex::new(None),
        }
    }

    /// Override the restart annotation key.
    pub fn annotation_key(mut self, key: impl Into<String>) -> Self {
        self.annotation_key = key.into();
        self
    }

    /// Build a mutated copy of `resource` for `intent`.
    pub fn build(
        &self,
        resource: &WorkloadResource,
        intent: Intent,
    ) -> Result<MutatedResource, MutationError> {
        let kind = resource.kind();
        if !supports(&kind, intent) {
            return Err(MutationError::UnsupportedIntent { kind, intent });
        }

        let mut manifest = resource.body().clone();
        let stamped_at = match intent {
            Intent::Restart => {
                let annotations = pod_template_annotations(&mut manifest, &kind)?;
                let stamp = self.next_stamp();
                annotations.insert(
                    self.annotation_key.clone(),
                    Value::String(stamp.to_iso8601()),
                );
                stamp
            }
        };

        Ok(MutatedResource {
            target: resource.resource_ref(),
            intent,
            stamped_at,
            manifest,
        })
    }

    fn next_stamp(&self) -> Timestamp {
        let now = Timestamp::from_datetime((self.clock)());
        let mut last = self
            .last_stamp
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let stamp = match *last {
            Some(prev) if now <= prev => Timestamp(prev.0 + 1),
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}

/// `spec.template.metadata.annotations`, created if absent.
fn pod_template_annotations<'a>(
    manifest: &'a mut Value,
    kind: &WorkloadKind,
) -> Result<&'a mut Map<String, Value>, MutationError> {
    let template = manifest
        .get_mut("spec")
        .and_then(|spec| spec.get_mut("template"))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| MutationError::MissingPodTemplate(kind.clone()))?;

    let metadata = template
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if metadata.is_null() {
        *metadata = Value::Object(Map::new());
    }
    let metadata = metadata.as_object_mut().ok_or_else(|| {
        MutationError::InvalidResource("spec.template.metadata is not an object".to_string())
    })?;

    let annotations = metadata
        .entry("annotations")
        .or_insert_with(|| Value::Object(Map::new()));
    if annotations.is_null() {
        *annotations = Value::Object(Map::new());
    }
    annotations.as_object_mut().ok_or_else(|| {
        MutationError::InvalidResource(
            "spec.template.metadata.annotations is not an object".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_clock(ms: i64) -> ClockFn {
        Box::new(move || Utc.timestamp_millis_opt(ms).unwrap())
    }

    fn workload(kind: &str) -> WorkloadResource {
        WorkloadResource::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": kind,
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {
                "replicas": 2,
                "template": {
                    "metadata": {
                        "labels": {"app": "web"},
                        "annotations": {"team": "platform"}
                    },
                    "spec": {"containers": [{"name": "web", "image": "nginx"}]}
                }
            }
        }))
        .unwrap()
    }

    fn restarted_at(m: &MutatedResource) -> &str {
        m.manifest
            .pointer("/spec/template/metadata/annotations/kubectl.kubernetes.io~1restartedAt")
            .and_then(Value::as_str)
            .unwrap()
    }

    #[test]
    fn test_capability_table() {
        assert!(supports(&WorkloadKind::Deployment, Intent::Restart));
        assert!(supports(&WorkloadKind::StatefulSet, Intent::Restart));
        assert!(supports(&WorkloadKind::DaemonSet, Intent::Restart));
        assert!(!supports(&WorkloadKind::ReplicaSet, Intent::Restart));
        assert!(!supports(&WorkloadKind::Job, Intent::Restart));
        assert!(!supports(&WorkloadKind::CronJob, Intent::Restart));
        assert!(!supports(&WorkloadKind::Pod, Intent::Restart));
        assert!(!supports(&WorkloadKind::Other("Widget".into()), Intent::Restart));
    }

    #[test]
    fn test_restart_sets_annotation() {
        let builder = MutationBuilder::with_clock(fixed_clock(1_700_000_000_123));
        let out = builder.build(&workload("Deployment"), Intent::Restart).unwrap();
        assert_eq!(restarted_at(&out), "2023-11-14T22:13:20.123Z");
        assert_eq!(out.stamped_at, Timestamp(1_700_000_000_123));
        assert_eq!(out.target.target_key().as_str(), "Deployment/default/web");
        assert_eq!(out.intent, Intent::Restart);
    }

    #[test]
    fn test_restart_merges_existing_annotations() {
        let builder = MutationBuilder::with_clock(fixed_clock(0));
        let out = builder.build(&workload("StatefulSet"), Intent::Restart).unwrap();
        let annotations = out
            .manifest
            .pointer("/spec/template/metadata/annotations")
            .unwrap();
        assert_eq!(annotations["team"], "platform");
        assert_eq!(annotations.as_object().unwrap().len(), 2);
        assert_eq!(
            out.manifest.pointer("/spec/template/metadata/labels/app").unwrap(),
            "web"
        );
    }

    #[test]
    fn test_restart_does_not_mutate_input() {
        let input = workload("DaemonSet");
        let before = input.clone();
        let builder = MutationBuilder::new();
        let out = builder.build(&input, Intent::Restart).unwrap();
        assert_eq!(input, before);
        assert_ne!(out.manifest, *input.body());
    }

    #[test]
    fn test_restart_creates_missing_metadata() {
        let input = WorkloadResource::from_value(json!({
            "kind": "Deployment",
            "metadata": {"name": "api"},
            "spec": {"template": {"spec": {}}}
        }))
        .unwrap();
        let builder = MutationBuilder::with_clock(fixed_clock(1_000));
        let out = builder.build(&input, Intent::Restart).unwrap();
        assert_eq!(restarted_at(&out), "1970-01-01T00:00:01.000Z");
    }

    #[test]
    fn test_restart_replaces_null_annotations() {
        let input = WorkloadResource::from_value(json!({
            "kind": "Deployment",
            "metadata": {"name": "api"},
            "spec": {"template": {"metadata": {"annotations": null}}}
        }))
        .unwrap();
        let builder = MutationBuilder::with_clock(fixed_clock(1_000));
        assert!(builder.build(&input, Intent::Restart).is_ok());
    }

    #[test]
    fn test_restart_without_pod_template_fails() {
        let input = WorkloadResource::from_value(json!({
            "kind": "Deployment",
            "metadata": {"name": "api"},
            "spec": {}
        }))
        .unwrap();
        let err = MutationBuilder::new().build(&input, Intent::Restart).unwrap_err();
        assert_eq!(err, MutationError::MissingPodTemplate(WorkloadKind::Deployment));
    }

    #[test]
    fn test_restart_with_malformed_annotations_fails() {
        let input = WorkloadResource::from_value(json!({
            "kind": "Deployment",
            "metadata": {"name": "api"},
            "spec": {"template": {"metadata": {"annotations": "oops"}}}
        }))
        .unwrap();
        let err = MutationBuilder::new().build(&input, Intent::Restart).unwrap_err();
        assert!(matches!(err, MutationError::InvalidResource(_)));
    }

    #[test]
    fn test_unsupported_kinds_rejected() {
        let builder = MutationBuilder::new();
        for kind in ["ReplicaSet", "Job", "CronJob", "Pod", "ConfigMap"] {
            let err = builder.build(&workload(kind), Intent::Restart).unwrap_err();
            assert!(
                matches!(err, MutationError::UnsupportedIntent { intent: Intent::Restart, .. }),
                "{} should be rejected",
                kind
            );
        }
    }

    #[test]
    fn test_stamps_strictly_increase_with_frozen_clock() {
        let builder = MutationBuilder::with_clock(fixed_clock(5_000));
        let input = workload("Deployment");
        let a = builder.build(&input, Intent::Restart).unwrap();
        let b = builder.build(&input, Intent::Restart).unwrap();
        let c = builder.build(&input, Intent::Restart).unwrap();
        assert!(a.stamped_at < b.stamped_at);
        assert!(b.stamped_at < c.stamped_at);
        assert_eq!(restarted_at(&b), "1970-01-01T00:00:05.001Z");
        assert_ne!(a.manifest, b.manifest);
    }

    #[test]
    fn test_stamps_follow_advancing_clock() {
        let ticks = std::sync::Arc::new(std::sync::atomic::AtomicI64::new(10_000));
        let t = std::sync::Arc::clone(&ticks);
        let builder = MutationBuilder::with_clock(Box::new(move || {
            let ms = t.fetch_add(1_000, std::sync::atomic::Ordering::SeqCst);
            Utc.timestamp_millis_opt(ms).unwrap()
        }));
        let input = workload("Deployment");
        let a = builder.build(&input, Intent::Restart).unwrap();
        let b = builder.build(&input, Intent::Restart).unwrap();
        assert_eq!(a.stamped_at, Timestamp(10_000));
        assert_eq!(b.stamped_at, Timestamp(11_000));
    }

    #[test]
    fn test_custom_annotation_key() {
        let builder =
            MutationBuilder::with_clock(fixed_clock(0)).annotation_key("example.com/restartedAt");
        let out = builder.build(&workload("Deployment"), Intent::Restart).unwrap();
        assert!(out
            .manifest
            .pointer("/spec/template/metadata/annotations/example.com~1restartedAt")
            .is_some());
    }
}
