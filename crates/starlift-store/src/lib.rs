// SPDX-License-Identifier: BUSL-1.1
//! # starlift-store — Export Store
//!
//! In-memory index of platform exports keyed by export id, bounded by a
//! configurable cap with oldest-by-timestamp eviction, and persisted as a
//! single JSON document (`platform_exports.json`).
//!
//! Persistence is debounced: a burst of inserts inside the debounce window
//! produces one flush. Writes are atomic and serialized; loads are
//! tolerant (missing file → empty store, corrupt file → warning + empty
//! store). Export payloads are stored verbatim — the store never inspects
//! or re-encodes them — and each record carries a SHA-256 digest so a
//! reload can detect damaged index entries.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use starlift_core::{payload_digest, ExportId, InstanceId};
use starlift_persist::{load_json_or_default, FileWriter};

/// Default cap on stored exports.
pub const DEFAULT_MAX_EXPORTS: usize = 50;

/// Default debounce window for index flushes.
pub const DEFAULT_FLUSH_DEBOUNCE: Duration = Duration::from_millis(500);

/// One stored platform export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    /// Globally unique export id.
    pub export_id: ExportId,
    /// Platform display name.
    pub platform_name: String,
    /// The instance that produced the export.
    pub source_instance_id: InstanceId,
    /// The opaque export payload, byte-for-byte as received.
    pub export_data: Value,
    /// Creation time (epoch ms).
    pub timestamp: i64,
    /// Serialized payload size in bytes.
    pub size: u64,
    /// SHA-256 digest of the payload, for integrity checks on reload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ExportRecord {
    /// Build a record from a received payload, computing size and digest.
    pub fn new(
        export_id: ExportId,
        platform_name: impl Into<String>,
        source_instance_id: InstanceId,
        export_data: Value,
        timestamp: i64,
    ) -> Self {
        let size = serde_json::to_vec(&export_data)
            .map(|b| b.len() as u64)
            .unwrap_or(0);
        let digest = payload_digest(&export_data);
        Self {
            export_id,
            platform_name: platform_name.into(),
            source_instance_id,
            export_data,
            timestamp,
            size,
            digest: Some(digest),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the durable index file.
    pub index_path: PathBuf,
    /// Maximum number of stored exports before eviction.
    pub max_exports: usize,
    /// Debounce window for index flushes.
    pub flush_debounce: Duration,
}

impl StoreConfig {
    /// Defaults with the index under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_path: data_dir.into().join("platform_exports.json"),
            max_exports: DEFAULT_MAX_EXPORTS,
            flush_debounce: DEFAULT_FLUSH_DEBOUNCE,
        }
    }
}

/// Bounded, durable export store.
pub struct ExportStore {
    records: Mutex<HashMap<ExportId, ExportRecord>>,
    config: StoreConfig,
    writer: FileWriter,
    flush_pending: AtomicBool,
    me: Weak<Self>,
}

impl ExportStore {
    /// Create a store and load any persisted index. Must be called within
    /// a tokio runtime (the index writer task is spawned here).
    pub fn open(config: StoreConfig) -> Arc<Self> {
        let writer = FileWriter::spawn(config.index_path.clone());
        let store = Arc::new_cyclic(|me| Self {
            records: Mutex::new(HashMap::new()),
            config,
            writer,
            flush_pending: AtomicBool::new(false),
            me: me.clone(),
        });
        store.load();
        store
    }

    /// Load the persisted index, dropping records whose payload digest no
    /// longer matches.
    fn load(&self) {
        let persisted: HashMap<String, ExportRecord> =
            load_json_or_default(&self.config.index_path);
        if persisted.is_empty() {
            return;
        }

        let mut records = self.records.lock();
        for (key, record) in persisted {
            if let Some(expected) = &record.digest {
                let actual = payload_digest(&record.export_data);
                if *expected != actual {
                    tracing::warn!(
                        export_id = %key,
                        "stored export failed integrity check; dropping record"
                    );
                    continue;
                }
            }
            records.insert(record.export_id.clone(), record);
        }
        tracing::info!(count = records.len(), "loaded persisted exports");
    }

    /// Insert a record, evicting oldest-by-timestamp beyond the cap.
    /// Idempotent on export id.
    pub fn put(&self, record: ExportRecord) {
        let mut records = self.records.lock();
        records.insert(record.export_id.clone(), record);

        while records.len() > self.config.max_exports {
            // Oldest timestamp first; id as a deterministic tie-breaker.
            let oldest = records
                .values()
                .min_by(|a, b| {
                    a.timestamp
                        .cmp(&b.timestamp)
                        .then_with(|| a.export_id.as_str().cmp(b.export_id.as_str()))
                })
                .map(|r| r.export_id.clone());
            match oldest {
                Some(id) => {
                    tracing::info!(export_id = %id, "evicting oldest export beyond cap");
                    records.remove(&id);
                }
                None => break,
            }
        }
    }

    /// Fetch a record by id.
    pub fn get(&self, export_id: &ExportId) -> Option<ExportRecord> {
        self.records.lock().get(export_id).cloned()
    }

    /// Whether a record exists for `export_id`.
    pub fn contains(&self, export_id: &ExportId) -> bool {
        self.records.lock().contains_key(export_id)
    }

    /// Remove a record unconditionally.
    pub fn delete(&self, export_id: &ExportId) -> bool {
        self.records.lock().remove(export_id).is_some()
    }

    /// All records, newest first.
    pub fn list(&self) -> Vec<ExportRecord> {
        let mut records: Vec<_> = self.records.lock().values().cloned().collect();
        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.export_id.as_str().cmp(b.export_id.as_str()))
        });
        records
    }

    /// Number of stored exports.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn snapshot(&self) -> Value {
        let records = self.records.lock();
        let mut map = serde_json::Map::new();
        for (id, record) in records.iter() {
            if let Ok(value) = serde_json::to_value(record) {
                map.insert(id.as_str().to_string(), value);
            }
        }
        Value::Object(map)
    }

    /// Queue an immediate index flush. Failures are logged and swallowed.
    pub fn flush(&self) {
        if let Err(err) = self.writer.submit(self.snapshot()) {
            tracing::warn!(%err, "export index flush could not be queued");
        }
    }

    /// Queue a flush and wait for the write attempt (shutdown path).
    pub async fn flush_and_wait(&self) {
        if let Err(err) = self.writer.submit_and_wait(self.snapshot()).await {
            tracing::warn!(%err, "export index shutdown flush failed");
        }
    }

    /// Schedule a debounced flush: the first call in a window arms a
    /// delayed write, subsequent calls within the window coalesce into it.
    pub fn schedule_flush(&self) {
        if self.flush_pending.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(store) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(store.config.flush_debounce).await;
            store.flush_pending.store(false, Ordering::Release);
            store.flush();
        });
    }
}

impl std::fmt::Debug for ExportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportStore")
            .field("records", &self.len())
            .field("max_exports", &self.config.max_exports)
            .finish()
    }
}
