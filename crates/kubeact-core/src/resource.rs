//! JSON-backed workload object.
//!
//! The action layer does not model resource schemas. A `WorkloadResource` is
//! the manifest as the API server returned it, plus typed accessors for the
//! handful of metadata fields the orchestration needs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::types::{ResourceRef, WorkloadKind};

/// A cluster object held as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkloadResource {
    body: Value,
}

impl WorkloadResource {
    /// Wrap a manifest, checking that `kind` and `metadata.name` are present.
    pub fn from_value(body: Value) -> Result<Self> {
        if !body.is_object() {
            return Err(CoreError::InvalidResource(
                "manifest must be a JSON object".to_string(),
            ));
        }
        if body.get("kind").and_then(Value::as_str).is_none() {
            return Err(CoreError::InvalidResource("missing kind".to_string()));
        }
        match body.pointer("/metadata/name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => {}
            _ => {
                return Err(CoreError::InvalidResource(
                    "missing metadata.name".to_string(),
                ))
            }
        }
        Ok(Self { body })
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let body: Value = serde_json::from_str(text)?;
        Self::from_value(body)
    }

    pub fn kind(&self) -> WorkloadKind {
        WorkloadKind::from(self.body.get("kind").and_then(Value::as_str).unwrap_or(""))
    }

    pub fn name(&self) -> &str {
        self.body
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.body
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
    }

    /// `metadata.resourceVersion`, when the object came from a server.
    pub fn resource_version(&self) -> Option<&str> {
        self.body
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str)
    }

    /// Name shown to users in prompts and notifications.
    pub fn display_name(&self) -> &str {
        self.name()
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(
            self.kind(),
            self.namespace().map(str::to_string),
            self.name(),
        )
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}
