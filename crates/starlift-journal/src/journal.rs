// SPDX-License-Identifier: BUSL-1.1
//! # Transaction Journal
//!
//! In-memory event streams per transfer plus the bounded persisted window.
//! The persisted file (`transaction_logs.json`) holds the newest
//! [`MAX_PERSISTED_LOGS`] records, upserted by transfer id and rewritten
//! atomically on every persist. A record carries the full transfer info,
//! the derived summary, and the complete event stream, so an operator can
//! reconstruct what happened after a restart.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use starlift_core::{now_ms, TransferId};
use starlift_fanout::SubscriptionManager;
use starlift_persist::{load_json_or_default, FileWriter};
use starlift_state::{Transfer, TransferPhase};

use crate::event::{EventType, LogEvent};
use crate::summary::{detailed_transfer_summary, transfer_summary};

/// Cap on persisted transaction-log records.
pub const MAX_PERSISTED_LOGS: usize = 10;

/// One persisted transaction-log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLog {
    /// The transfer this record belongs to.
    pub transfer_id: TransferId,
    /// The full transfer record at persist time.
    pub transfer_info: Value,
    /// Derived summary (result, durations, phases, metric blocks).
    pub summary: Value,
    /// The complete event stream.
    pub events: Vec<LogEvent>,
    /// When this record was (last) persisted (epoch ms).
    pub saved_at: i64,
}

/// Journal configuration.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Path of the persisted log file.
    pub log_path: PathBuf,
    /// Cap on persisted records.
    pub max_persisted: usize,
}

impl JournalConfig {
    /// Defaults with the log file under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_path: data_dir.into().join("transaction_logs.json"),
            max_persisted: MAX_PERSISTED_LOGS,
        }
    }
}

/// Per-transfer transaction logger with durable bounded history.
pub struct TransactionJournal {
    events: Mutex<HashMap<TransferId, Vec<LogEvent>>>,
    persisted: Mutex<Vec<PersistedLog>>,
    writer: FileWriter,
    fanout: Arc<SubscriptionManager>,
    max_persisted: usize,
}

impl TransactionJournal {
    /// Create a journal and load the persisted window. Must be called
    /// within a tokio runtime (the log writer task is spawned here).
    pub fn open(config: JournalConfig, fanout: Arc<SubscriptionManager>) -> Arc<Self> {
        let writer = FileWriter::spawn(config.log_path.clone());
        let persisted: Vec<PersistedLog> = load_json_or_default(&config.log_path);
        if !persisted.is_empty() {
            tracing::info!(count = persisted.len(), "loaded persisted transaction logs");
        }
        Arc::new(Self {
            events: Mutex::new(HashMap::new()),
            persisted: Mutex::new(persisted),
            writer,
            fanout,
            max_persisted: config.max_persisted,
        })
    }

    // -----------------------------------------------------------------------
    // Event append & phases
    // -----------------------------------------------------------------------

    /// Append an event to a transfer's stream and notify log subscribers.
    ///
    /// `transfer` supplies `started_at` for the elapsed computation; pass
    /// `None` when the transfer is unknown (elapsed reports 0, the append
    /// still succeeds).
    pub fn log_event(
        &self,
        transfer: Option<&Transfer>,
        transfer_id: &TransferId,
        event_type: EventType,
        message: impl Into<String>,
        details: serde_json::Map<String, Value>,
    ) -> LogEvent {
        let timestamp_ms = now_ms();
        let elapsed_ms = transfer
            .map(|t| (timestamp_ms - t.started_at).max(0))
            .unwrap_or(0);

        let event = {
            let mut streams = self.events.lock();
            let stream = streams.entry(transfer_id.clone()).or_default();
            let delta_ms = stream
                .last()
                .map(|prev| (timestamp_ms - prev.timestamp_ms).max(0))
                .unwrap_or(0);
            let event = LogEvent::new(
                timestamp_ms,
                elapsed_ms,
                delta_ms,
                event_type,
                message,
                details,
            );
            stream.push(event.clone());
            event
        };

        tracing::debug!(
            transfer = %transfer_id,
            event = %event_type,
            elapsed_ms = event.elapsed_ms,
            "{}",
            event.message
        );

        if let Ok(payload) = serde_json::to_value(&event) {
            self.fanout.emit_log_update(transfer_id, payload);
        }
        event
    }

    /// Open a phase on the transfer record.
    pub fn start_phase(&self, transfer: &mut Transfer, phase: TransferPhase) {
        transfer.phases.open(phase, now_ms());
        tracing::debug!(transfer = %transfer.transfer_id, %phase, "phase started");
    }

    /// Close a phase and return its duration (0 if it was never opened).
    pub fn end_phase(&self, transfer: &mut Transfer, phase: TransferPhase) -> i64 {
        let duration = transfer.phases.close(phase, now_ms());
        tracing::debug!(
            transfer = %transfer.transfer_id,
            %phase,
            duration_ms = duration,
            "phase ended"
        );
        duration
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The live event stream for a transfer, if it has one.
    pub fn events_for(&self, transfer_id: &TransferId) -> Option<Vec<LogEvent>> {
        self.events.lock().get(transfer_id).cloned()
    }

    /// The newest event timestamp in a transfer's live stream.
    pub fn last_event_at(&self, transfer_id: &TransferId) -> Option<i64> {
        self.events
            .lock()
            .get(transfer_id)
            .and_then(|stream| stream.last().map(|e| e.timestamp_ms))
    }

    /// Drop the live event stream of a pruned transfer. Persisted records
    /// are unaffected.
    pub fn drop_events(&self, transfer_id: &TransferId) {
        self.events.lock().remove(transfer_id);
    }

    /// Detailed summary of a live transfer.
    pub fn detailed_summary(&self, transfer: &Transfer) -> Value {
        detailed_transfer_summary(
            transfer,
            self.last_event_at(&transfer.transfer_id),
            now_ms(),
        )
    }

    /// Full record for a live transfer: info, summary, and event stream.
    pub fn live_record(&self, transfer: &Transfer) -> Value {
        let events = self.events_for(&transfer.transfer_id).unwrap_or_default();
        serde_json::json!({
            "transferId": transfer.transfer_id,
            "transferInfo": transfer,
            "summary": self.detailed_summary(transfer),
            "events": events,
        })
    }

    /// Persisted record for a transfer, if one is on disk.
    pub fn persisted_record(&self, transfer_id: &TransferId) -> Option<PersistedLog> {
        self.persisted
            .lock()
            .iter()
            .find(|record| record.transfer_id == *transfer_id)
            .cloned()
    }

    /// Number of persisted records.
    pub fn persisted_len(&self) -> usize {
        self.persisted.lock().len()
    }

    /// Transfer summaries: active transfers unioned with persisted-only
    /// records, deduplicated by transfer id (active wins), sorted by
    /// `startedAt` descending, truncated to `limit`.
    pub fn transfer_summaries(&self, active: &[Transfer], limit: usize) -> Vec<Value> {
        let mut entries: Vec<(i64, Value)> = Vec::new();
        let mut seen: Vec<TransferId> = Vec::new();

        for transfer in active {
            entries.push((transfer.started_at, transfer_summary(transfer)));
            seen.push(transfer.transfer_id.clone());
        }

        {
            let persisted = self.persisted.lock();
            for record in persisted.iter() {
                if seen.contains(&record.transfer_id) {
                    continue;
                }
                let started_at = record
                    .summary
                    .get("startedAt")
                    .and_then(Value::as_i64)
                    .unwrap_or(record.saved_at);
                entries.push((started_at, record.summary.clone()));
            }
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries
            .into_iter()
            .take(limit)
            .map(|(_, summary)| summary)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Upsert this transfer's record into the persisted window and queue
    /// an atomic rewrite. Failures are logged and swallowed.
    pub fn persist_transaction_log(&self, transfer: &Transfer) {
        let record = PersistedLog {
            transfer_id: transfer.transfer_id.clone(),
            transfer_info: serde_json::to_value(transfer).unwrap_or(Value::Null),
            summary: self.detailed_summary(transfer),
            events: self.events_for(&transfer.transfer_id).unwrap_or_default(),
            saved_at: now_ms(),
        };

        let snapshot = {
            let mut persisted = self.persisted.lock();
            persisted.retain(|existing| existing.transfer_id != record.transfer_id);
            persisted.push(record);
            let overflow = persisted.len().saturating_sub(self.max_persisted);
            if overflow > 0 {
                persisted.drain(..overflow);
            }
            serde_json::to_value(&*persisted)
        };

        match snapshot {
            Ok(snapshot) => {
                if let Err(err) = self.writer.submit(snapshot) {
                    tracing::warn!(%err, "transaction log flush could not be queued");
                }
            }
            Err(err) => {
                tracing::warn!(%err, "transaction log snapshot failed to serialize");
            }
        }
    }

    /// Queue a final rewrite and wait for the write attempt (shutdown).
    pub async fn flush_and_wait(&self) {
        let snapshot = {
            let persisted = self.persisted.lock();
            serde_json::to_value(&*persisted)
        };
        if let Ok(snapshot) = snapshot {
            if let Err(err) = self.writer.submit_and_wait(snapshot).await {
                tracing::warn!(%err, "transaction log shutdown flush failed");
            }
        }
    }
}

impl std::fmt::Debug for TransactionJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionJournal")
            .field("live_streams", &self.events.lock().len())
            .field("persisted", &self.persisted_len())
            .finish()
    }
}
