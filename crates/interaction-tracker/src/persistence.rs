//! Snapshot persistence
//!
//! The whole buffer is serialized to one key. Writes go through a single
//! background writer so they land in the order they were initiated; a burst of
//! queued snapshots collapses to the newest one.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::error::StorageError;
use crate::event::InteractionEvent;
use crate::storage::KeyValueStore;

/// Serialize the buffer as stored under the snapshot key.
pub fn encode_snapshot(events: &[InteractionEvent]) -> Result<String, StorageError> {
    serde_json::to_string(events).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Parse a stored snapshot.
pub fn decode_snapshot(raw: &str) -> Result<Vec<InteractionEvent>, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Read the snapshot once. Missing, unreadable and corrupt snapshots all yield
/// an empty sequence; the latter two are logged.
pub fn restore(store: &dyn KeyValueStore, key: &str) -> Vec<InteractionEvent> {
    let raw = match store.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("Failed to read event snapshot {:?}: {}, starting empty", key, e);
            return Vec::new();
        }
    };

    match decode_snapshot(&raw) {
        Ok(events) => {
            tracing::debug!("Restored {} events from {:?}", events.len(), key);
            events
        }
        Err(e) => {
            tracing::warn!("Discarding corrupt event snapshot {:?}: {}", key, e);
            Vec::new()
        }
    }
}

enum WriteCommand {
    Snapshot(String),
    Barrier(oneshot::Sender<()>),
}

/// Handle to the background writer task.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotWriter {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl SnapshotWriter {
    /// Spawn the writer on `runtime`. It exits once every handle is dropped
    /// and the queue is drained.
    pub(crate) fn spawn(runtime: &Handle, store: Arc<dyn KeyValueStore>, key: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_writer(rx, store, key));
        Self { tx }
    }

    /// Queue a snapshot. Fire-and-forget: failures are logged by the writer.
    pub(crate) fn submit(&self, snapshot: String) {
        if self.tx.send(WriteCommand::Snapshot(snapshot)).is_err() {
            tracing::warn!("Snapshot writer has stopped; dropping persistence write");
        }
    }

    /// Wait until every snapshot submitted before this call has been written.
    pub(crate) async fn sync(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteCommand::Barrier(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
    store: Arc<dyn KeyValueStore>,
    key: String,
) {
    while let Some(command) = rx.recv().await {
        match command {
            WriteCommand::Barrier(done) => {
                let _ = done.send(());
            }
            WriteCommand::Snapshot(mut latest) => {
                let mut barrier = None;
                while let Ok(next) = rx.try_recv() {
                    match next {
                        WriteCommand::Snapshot(snapshot) => latest = snapshot,
                        WriteCommand::Barrier(done) => {
                            barrier = Some(done);
                            break;
                        }
                    }
                }

                write_snapshot(&store, &key, latest).await;

                if let Some(done) = barrier {
                    let _ = done.send(());
                }
            }
        }
    }
    tracing::debug!("Snapshot writer for {:?} stopped", key);
}

async fn write_snapshot(store: &Arc<dyn KeyValueStore>, key: &str, snapshot: String) {
    let store = Arc::clone(store);
    let key_owned = key.to_string();
    let result =
        tokio::task::spawn_blocking(move || store.set_item(&key_owned, &snapshot)).await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Failed to persist event snapshot {:?}: {}", key, e),
        Err(e) => tracing::warn!("Snapshot write task failed for {:?}: {}", key, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Backend("unavailable".into()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Backend("unavailable".into()))
        }

        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_restore_missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(restore(&store, "events").is_empty());
    }

    #[test]
    fn test_restore_corrupt_snapshot_is_empty() {
        let store = MemoryStore::new();
        store.set_item("events", "{not json").unwrap();
        assert!(restore(&store, "events").is_empty());
    }

    #[test]
    fn test_restore_read_failure_is_empty() {
        assert!(restore(&FailingStore, "events").is_empty());
    }

    #[test]
    fn test_restore_reads_encoded_snapshot() {
        let store = MemoryStore::new();
        let events = vec![
            InteractionEvent::new("a").with_timestamp(1),
            InteractionEvent::new("b").with_timestamp(2),
        ];
        store
            .set_item("events", &encode_snapshot(&events).unwrap())
            .unwrap();
        assert_eq!(restore(&store, "events"), events);
    }

    #[tokio::test]
    async fn test_writer_keeps_last_submitted_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let writer = SnapshotWriter::spawn(
            &Handle::current(),
            store.clone() as Arc<dyn KeyValueStore>,
            "events".to_string(),
        );

        for i in 0..20 {
            writer.submit(format!("[{}]", i));
        }
        writer.sync().await;

        assert_eq!(store.get_item("events").unwrap().as_deref(), Some("[19]"));
    }

    #[tokio::test]
    async fn test_writer_failures_are_swallowed() {
        let writer = SnapshotWriter::spawn(
            &Handle::current(),
            Arc::new(FailingStore),
            "events".to_string(),
        );
        writer.submit("[]".to_string());
        writer.sync().await;
    }
}
