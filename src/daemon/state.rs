use crate::config::Config;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

#[derive(Debug, Clone, serde::Serialize)]
pub(super) struct DaemonStatus {
    #[serde(flatten)]
    snapshot: serde_json::Map<String, serde_json::Value>,
    written_at: String,
}

fn render_state() -> Vec<u8> {
    let mut json = crate::diagnostics::health::snapshot_json();
    if let Some(snapshot) = json.as_object().cloned() {
        let status = DaemonStatus {
            snapshot,
            written_at: Utc::now().to_rfc3339(),
        };
        json = serde_json::to_value(status).unwrap_or_else(|_| serde_json::json!({}));
    }
    serde_json::to_vec_pretty(&json).unwrap_or_else(|_| b"{}".to_vec())
}

pub(super) fn spawn_state_writer(config: Arc<Config>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let path = config.state_file_path();
        if let Some(parent) = path.parent()
            && let Err(error) = tokio::fs::create_dir_all(parent).await
        {
            tracing::warn!(%error, "failed to create state file directory");
        }

        let mut interval = tokio::time::interval(Duration::from_secs(super::STATUS_FLUSH_SECONDS));
        loop {
            interval.tick().await;
            if let Err(error) = tokio::fs::write(&path, render_state()).await {
                tracing::warn!(%error, "failed to write daemon state file");
            }
        }
    })
}

/// Reads the snapshot last flushed by a running (or stopped) daemon.
pub fn read_state_file(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("No daemon state at {}", path.display()))?;
    serde_json::from_str(&raw).context("Daemon state file is not valid JSON")
}
