//! Persistence and broadcast of suggestion payloads.

use std::path::PathBuf;

use async_trait::async_trait;
use shared_types::SuggestionPayload;
use thiserror::Error;

use crate::clients::supabase::SupabaseClient;

/// File write failure. Logged by the poller; the loop continues.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to serialize suggestion payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write suggestion file: {0}")]
    Io(#[from] std::io::Error),
    #[error("persistence task was cancelled")]
    Cancelled,
}

/// Capability contract for delivering a suggestion payload downstream.
#[async_trait]
pub trait SuggestionSink: Send + Sync {
    async fn persist(&self, payload: &SuggestionPayload) -> Result<(), PersistenceError>;
}

/// Sink that writes the payload to a fixed file (full overwrite) and then
/// best-effort broadcasts it over the realtime channel. Broadcast failures
/// never affect the persistence outcome.
pub struct FileSuggestionSink {
    path: PathBuf,
    broadcaster: Option<SupabaseClient>,
}

impl FileSuggestionSink {
    pub fn new(path: PathBuf, broadcaster: Option<SupabaseClient>) -> Self {
        Self { path, broadcaster }
    }
}

#[async_trait]
impl SuggestionSink for FileSuggestionSink {
    async fn persist(&self, payload: &SuggestionPayload) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(payload)?;
        let path = self.path.clone();

        // File I/O runs on the blocking pool so the poll loop's timing is
        // not stalled by a slow disk.
        tokio::task::spawn_blocking(move || -> Result<(), PersistenceError> {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&path, json)?;
            Ok(())
        })
        .await
        .map_err(|_| PersistenceError::Cancelled)??;

        tracing::info!("Updated event suggestions at {}", self.path.display());

        if let Some(broadcaster) = &self.broadcaster {
            if let Err(e) = broadcaster.broadcast_suggestion(payload).await {
                tracing::error!("Supabase broadcast failed: {}", e);
            }
        } else {
            tracing::warn!("No broadcaster configured; skipping realtime broadcast");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::SuggestionContent;

    fn payload(changes: Vec<String>) -> SuggestionPayload {
        SuggestionPayload {
            user_id: "u1".to_string(),
            generated_at: Utc::now(),
            changes,
            suggestion: SuggestionContent::Text("rest more".to_string()),
        }
    }

    #[tokio::test]
    async fn test_persist_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event_suggestions.json");
        let sink = FileSuggestionSink::new(path.clone(), None);

        sink.persist(&payload(vec!["Added event 'Gym' (ID: 1)".to_string()]))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains('\n'), "expected pretty-printed output");
        let parsed: SuggestionPayload = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.user_id, "u1");
        assert_eq!(parsed.changes.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_overwrites_prior_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event_suggestions.json");
        let sink = FileSuggestionSink::new(path.clone(), None);

        sink.persist(&payload(vec!["first".to_string()])).await.unwrap();
        sink.persist(&payload(vec!["second".to_string()])).await.unwrap();

        let parsed: SuggestionPayload =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.changes, vec!["second".to_string()]);
    }

    #[tokio::test]
    async fn test_persist_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.json");
        let sink = FileSuggestionSink::new(path.clone(), None);

        sink.persist(&payload(vec![])).await.unwrap();
        assert!(path.exists());
    }
}
