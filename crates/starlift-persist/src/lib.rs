//! # starlift-persist — Durable JSON Files
//!
//! The coordinator persists two artifacts: the export index and the
//! transaction-log window. Both are whole-file JSON documents rewritten on
//! change. This crate provides the three guarantees they need:
//!
//! - **Atomicity**: writes go to a sibling temp file and are renamed into
//!   place, so readers never observe a half-written document.
//! - **Ordering**: writes to one file are serialized through a queue task,
//!   so a later snapshot never loses to an earlier one that finished late.
//! - **Tolerance**: a missing or corrupt file on startup degrades to the
//!   empty value with a logged warning, never a crash.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;

/// Errors from persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Filesystem failure.
    #[error("persistence I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Value could not be serialized.
    #[error("persistence serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The writer task for this file has shut down.
    #[error("write queue closed")]
    QueueClosed,
}

/// Atomically write `value` as pretty-printed JSON to `path`.
///
/// The document is written to `{path}.tmp` and renamed into place. The
/// parent directory is created if missing.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let bytes = serde_json::to_vec_pretty(value)?;
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a JSON document, tolerating absence and corruption.
///
/// Returns `Default::default()` when the file is missing; logs a warning
/// and returns the default when the file cannot be read or parsed.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to read persisted file; starting empty");
            return T::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "persisted file is malformed; starting empty");
            T::default()
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// A serialized writer for one file.
///
/// Snapshots submitted here are written in submission order by a dedicated
/// task. Write failures are logged and swallowed: the in-memory state
/// remains authoritative and a later successful write catches up.
#[derive(Debug, Clone)]
pub struct FileWriter {
    tx: mpsc::UnboundedSender<WriteJob>,
}

struct WriteJob {
    snapshot: serde_json::Value,
    ack: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FileWriter {
    /// Spawn the writer task for `path`. Must be called within a tokio
    /// runtime.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();
        tokio::spawn(async move {
            while let Some(WriteJob { snapshot, ack }) = rx.recv().await {
                // Blocking file I/O off the async threads.
                let path = path.clone();
                let result = tokio::task::spawn_blocking(move || {
                    atomic_write_json(&path, &snapshot)
                })
                .await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::warn!(%err, "persistence write failed; in-memory state remains authoritative");
                    }
                    Err(err) => {
                        tracing::warn!(%err, "persistence writer task panicked");
                    }
                }
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
        });
        Self { tx }
    }

    /// Queue a snapshot for writing. Returns an error only if the writer
    /// task is gone (runtime shutdown).
    pub fn submit(&self, snapshot: serde_json::Value) -> Result<(), PersistError> {
        self.tx
            .send(WriteJob {
                snapshot,
                ack: None,
            })
            .map_err(|_| PersistError::QueueClosed)
    }

    /// Queue a snapshot and wait for the write attempt to finish. Used at
    /// shutdown so the final state lands behind everything already queued.
    pub async fn submit_and_wait(
        &self,
        snapshot: serde_json::Value,
    ) -> Result<(), PersistError> {
        let (ack_tx, ack_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(WriteJob {
                snapshot,
                ack: Some(ack_tx),
            })
            .map_err(|_| PersistError::QueueClosed)?;
        ack_rx.await.map_err(|_| PersistError::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn atomic_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let value = json!({"e1": {"size": 10}, "e2": {"size": 20}});
        atomic_write_json(&path, &value).unwrap();

        let loaded: serde_json::Value = load_json_or_default(&path);
        assert_eq!(loaded, value);
        // No temp file left behind.
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/index.json");
        atomic_write_json(&path, &json!([])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: HashMap<String, i64> = load_json_or_default(&dir.path().join("absent.json"));
        assert!(loaded.is_empty());
    }

    #[test]
    fn corrupt_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, b"{not json at all").unwrap();

        let loaded: Vec<serde_json::Value> = load_json_or_default(&path);
        assert!(loaded.is_empty());
    }

    #[test]
    fn wrong_shape_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shape.json");
        std::fs::write(&path, b"{\"an\": \"object\"}").unwrap();

        // An object where an array is expected degrades to empty.
        let loaded: Vec<serde_json::Value> = load_json_or_default(&path);
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn file_writer_applies_writes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ordered.json");
        let writer = FileWriter::spawn(path.clone());

        for i in 0..20 {
            writer.submit(json!({"revision": i})).unwrap();
        }

        // Drain: poll until the final snapshot lands.
        for _ in 0..100 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            let current: serde_json::Value = load_json_or_default(&path);
            if current == json!({"revision": 19}) {
                return;
            }
        }
        panic!("final snapshot never observed");
    }

    #[test]
    fn overwrite_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replace.json");
        atomic_write_json(&path, &json!({"v": 1})).unwrap();
        atomic_write_json(&path, &json!({"v": 2})).unwrap();

        let loaded: serde_json::Value = load_json_or_default(&path);
        assert_eq!(loaded, json!({"v": 2}));
    }
}
