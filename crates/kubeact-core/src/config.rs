use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CoreError, Result};

/// Annotation written onto a pod template to trigger a rolling restart.
pub const DEFAULT_RESTART_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// Top-level configuration for kubeact.
///
/// Loaded from `~/.kubeact/config.toml` by default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubeactConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub restart: RestartConfig,
}

impl KubeactConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: KubeactConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Action scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How long a confirmed action can still be cancelled before it is sent.
    pub grace_period_ms: u64,
    /// Finished tasks kept for inspection.
    pub history_limit: usize,
    /// Buffer size of the lifecycle event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 5_000,
            history_limit: 50,
            event_capacity: 64,
        }
    }
}

impl SchedulerConfig {
    pub fn grace_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.grace_period_ms)
    }
}

/// Restart action settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartConfig {
    /// Pod-template annotation stamped with the restart instant.
    pub annotation_key: String,
    /// Verb the restart entry point must be authorized for.
    pub auth_verb: String,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            annotation_key: DEFAULT_RESTART_ANNOTATION.to_string(),
            auth_verb: "update".to_string(),
        }
    }
}
