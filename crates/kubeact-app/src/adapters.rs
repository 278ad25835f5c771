//! Terminal-side collaborators for the action engine.

use std::path::PathBuf;

use async_trait::async_trait;
use kubeact_action::{ApplyError, ConfirmationGate, ConfirmationPrompt, RemoteApply};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

/// Writes the applied manifest to a file, or to stdout.
pub struct FileApply {
    output: Option<PathBuf>,
}

impl FileApply {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }
}

#[async_trait]
impl RemoteApply for FileApply {
    async fn apply(&self, manifest: &Value) -> Result<(), ApplyError> {
        let mut text =
            serde_json::to_string_pretty(manifest).map_err(|e| ApplyError::Other(e.to_string()))?;
        text.push('\n');

        match &self.output {
            Some(path) => {
                tokio::fs::write(path, text)
                    .await
                    .map_err(|e| ApplyError::Other(format!("{}: {}", path.display(), e)))?;
                tracing::info!(path = %path.display(), "Manifest written");
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout
                    .write_all(text.as_bytes())
                    .await
                    .map_err(|e| ApplyError::Other(e.to_string()))?;
                stdout
                    .flush()
                    .await
                    .map_err(|e| ApplyError::Other(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Asks on stderr and reads a y/N answer from stdin.
pub struct StdinConfirm;

#[async_trait]
impl ConfirmationGate for StdinConfirm {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool {
        eprint!("{} [y/N] ", prompt.question());
        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Could not read confirmation");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Confirmation prompt aborted");
                false
            }
        }
    }
}

/// Only an explicit yes counts.
fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[tokio::test]
    async fn test_file_apply_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applied.json");
        let manifest = json!({"kind": "Deployment", "metadata": {"name": "web"}});

        FileApply::new(Some(path.clone()))
            .apply(&manifest)
            .await
            .unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, manifest);
    }

    #[tokio::test]
    async fn test_file_apply_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("applied.json");
        let err = FileApply::new(Some(path))
            .apply(&json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::Other(_)));
    }
}
