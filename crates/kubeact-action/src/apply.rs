//! The network-facing apply capability.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApplyError;

/// Submits a mutated manifest to the cluster API.
///
/// The scheduler treats the outcome as opaque: success, or a typed failure.
/// Timeouts are the implementation's responsibility.
#[async_trait]
pub trait RemoteApply: Send + Sync {
    async fn apply(&self, manifest: &Value) -> Result<(), ApplyError>;
}
