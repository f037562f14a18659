//! # Transfer Orchestrator
//!
//! One coordinator-wide orchestrator instance owns the active-transfer
//! table and the validation-timer table. Per-transfer mutations happen
//! under the table's entry lock and never across an await; RPCs and
//! persistence run against snapshots.
//!
//! At any moment the set of armed validation timers equals the set of
//! transfers in `awaiting_validation`: the timer is armed by the
//! transition into that state and disarmed by the validation callback (or
//! by pruning). The timer task re-checks the transfer state when it fires,
//! so a verdict racing the deadline wins cleanly.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::task::AbortHandle;

use starlift_core::{now_ms, ExportId, InstanceId, InstanceRef, TransferId};
use starlift_fanout::SubscriptionManager;
use starlift_gateway::Gateway;
use starlift_journal::{EventType, TransactionJournal};
use starlift_proto::{
    BasicResponse, DeleteSourcePlatformRequest, ExportPlatformRequest, ExportPlatformResponse,
    ImportPlatformRequest, NotificationMessage, PlatformExportEvent, RequestMessage,
    TransferStatusUpdate, TransferValidationEvent, UnlockSourcePlatformRequest,
};
use starlift_registry::{InstanceDirectory, TreeBuilder};
use starlift_state::{StateError, Transfer, TransferPhase, TransferStatus};
use starlift_store::{ExportRecord, ExportStore};

use crate::error::OrchestratorError;
use crate::metrics::{convert_tick_metrics, extract_payload_metrics};

/// Sentinel mismatch detail for synthesized timeout verdicts.
pub const VALIDATION_TIMEOUT_MESSAGE: &str =
    "Validation timeout - no response received within 2 minutes";

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long to wait for a validation verdict before synthesizing a
    /// failure.
    pub validation_timeout: Duration,
    /// How long to poll for an export payload to land in the store.
    pub export_store_timeout: Duration,
    /// Poll interval while waiting for the export payload.
    pub export_poll_interval: Duration,
    /// Cap on the active-transfer table.
    pub max_active_transfers: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            validation_timeout: Duration::from_millis(120_000),
            export_store_timeout: Duration::from_millis(10_000),
            export_poll_interval: Duration::from_millis(100),
            max_active_transfers: 100,
        }
    }
}

/// Operator request: one-shot export-and-transfer from a live platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartTransferRequest {
    /// The instance that owns the platform.
    pub source_instance_id: InstanceId,
    /// The destination instance, by id or name.
    pub target_instance_id: InstanceRef,
    /// Platform slot index on the source (1-based).
    pub source_platform_index: u32,
    /// Owning force; defaults to `player`.
    #[serde(default)]
    pub force_name: Option<String>,
}

/// Successful transfer kickoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStarted {
    /// The allocated transfer id.
    pub transfer_id: TransferId,
}

/// Operator request: non-destructive one-shot import of an uploaded
/// payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UploadImportRequest {
    /// The destination instance, by id or name.
    pub target_instance_id: InstanceRef,
    /// The export payload to import.
    pub export_data: Value,
    /// Display name override; defaults to the payload's `platformName`.
    #[serde(default)]
    pub platform_name: Option<String>,
    /// Owning force; defaults to `player`.
    #[serde(default)]
    pub force_name: Option<String>,
}

/// Outcome of an uploaded-payload import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImported {
    /// The export record minted for the uploaded payload.
    pub export_id: ExportId,
    /// The instance the payload was imported into.
    pub target_instance_id: InstanceId,
}

/// The saga driver.
pub struct TransferOrchestrator {
    gateway: Arc<Gateway>,
    directory: Arc<InstanceDirectory>,
    tree: Arc<TreeBuilder>,
    store: Arc<ExportStore>,
    journal: Arc<TransactionJournal>,
    fanout: Arc<SubscriptionManager>,
    active: DashMap<TransferId, Transfer>,
    timers: DashMap<TransferId, AbortHandle>,
    config: OrchestratorConfig,
    me: Weak<Self>,
}

impl TransferOrchestrator {
    /// Wire up an orchestrator over the coordinator's shared components.
    pub fn new(
        gateway: Arc<Gateway>,
        directory: Arc<InstanceDirectory>,
        tree: Arc<TreeBuilder>,
        store: Arc<ExportStore>,
        journal: Arc<TransactionJournal>,
        fanout: Arc<SubscriptionManager>,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            gateway,
            directory,
            tree,
            store,
            journal,
            fanout,
            active: DashMap::new(),
            timers: DashMap::new(),
            config,
            me: me.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// One-shot end-to-end transfer from a live platform.
    pub async fn start_platform_transfer(
        &self,
        request: StartTransferRequest,
    ) -> Result<TransferStarted, OrchestratorError> {
        let source_id = request.source_instance_id;
        if self
            .directory
            .resolve(&InstanceRef::Id(source_id.value()))
            .is_none()
        {
            return Err(OrchestratorError::UnknownSourceInstance(source_id));
        }
        if !self.directory.is_connected(source_id) {
            return Err(OrchestratorError::SourceNotConnected(source_id));
        }

        let target = self
            .directory
            .resolve(&request.target_instance_id)
            .ok_or_else(|| {
                OrchestratorError::UnknownTargetInstance(request.target_instance_id.to_string())
            })?;
        if target.0 == source_id {
            return Err(OrchestratorError::SameInstance);
        }
        if request.source_platform_index == 0 {
            return Err(OrchestratorError::InvalidPlatformIndex(
                request.source_platform_index,
            ));
        }
        let force_name = request
            .force_name
            .unwrap_or_else(|| "player".to_string());

        // Ask the source to export, then wait for the payload to land in
        // the store. Neither step creates a transfer record, so a timeout
        // here leaves nothing to clean up.
        let export_started = tokio::time::Instant::now();
        let response: ExportPlatformResponse = self
            .gateway
            .request_typed(
                source_id,
                RequestMessage::ExportPlatform(ExportPlatformRequest {
                    platform_index: request.source_platform_index,
                    force_name: force_name.clone(),
                }),
            )
            .await?;
        let export_request_ms = export_started.elapsed().as_millis() as i64;

        if !response.success {
            return Err(OrchestratorError::ExportRequestFailed(
                response
                    .error
                    .unwrap_or_else(|| "source declined the export request".to_string()),
            ));
        }
        let export_id = response
            .export_id
            .and_then(|id| ExportId::new(id).ok())
            .ok_or_else(|| {
                OrchestratorError::ExportRequestFailed(
                    "source did not return an export id".to_string(),
                )
            })?;

        let wait_started = tokio::time::Instant::now();
        loop {
            if self.store.contains(&export_id) {
                break;
            }
            if wait_started.elapsed() >= self.config.export_store_timeout {
                return Err(OrchestratorError::ExportWaitTimeout {
                    export_id,
                    waited_ms: wait_started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(self.config.export_poll_interval).await;
        }
        let wait_for_stored_ms = wait_started.elapsed().as_millis() as i64;

        let export_metrics = json!({
            "exportRequestMs": export_request_ms,
            "waitForStoredMs": wait_for_stored_ms,
            "exportPrepTotalMs": export_request_ms + wait_for_stored_ms,
        });

        self.transfer_platform(export_id, target, Some(export_metrics), Some(force_name))
            .await
    }

    /// Transfer an already-stored export to a target instance.
    pub async fn transfer_existing_export(
        &self,
        export_id: ExportId,
        target_instance: InstanceRef,
    ) -> Result<TransferStarted, OrchestratorError> {
        let target = self.directory.resolve(&target_instance).ok_or_else(|| {
            OrchestratorError::UnknownTargetInstance(target_instance.to_string())
        })?;
        self.transfer_platform(export_id, target, None, None).await
    }

    /// Core transfer path: stage the stored export onto the target and
    /// arm the validation wait.
    async fn transfer_platform(
        &self,
        export_id: ExportId,
        target: (InstanceId, String),
        export_metrics: Option<Value>,
        force_name: Option<String>,
    ) -> Result<TransferStarted, OrchestratorError> {
        let record = self
            .store
            .get(&export_id)
            .ok_or_else(|| OrchestratorError::ExportNotFound(export_id.clone()))?;
        if record.source_instance_id == target.0 {
            return Err(OrchestratorError::SameInstance);
        }

        let now = now_ms();
        let transfer_id = TransferId::generate(now);
        let source_name = self
            .directory
            .name_of(record.source_instance_id)
            .unwrap_or_else(|| format!("instance {}", record.source_instance_id));
        // The payload carries its own platform coordinates; the index is
        // needed later for the source-deletion RPC, and the force scopes
        // every instance-side operation.
        let platform_index = record
            .export_data
            .get("platformIndex")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        let force_name = force_name
            .or_else(|| {
                record
                    .export_data
                    .get("forceName")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "player".to_string());

        let mut transfer = Transfer::new(
            transfer_id.clone(),
            export_id.clone(),
            record.platform_name.clone(),
            platform_index,
            force_name,
            (record.source_instance_id, source_name),
            target.clone(),
            now,
        );
        transfer.export_metrics = export_metrics;
        transfer.payload_metrics = Some(extract_payload_metrics(
            &record.export_data,
            record.size,
        ));
        transfer
            .transition(TransferStatus::Transporting, now)
            .map_err(internal_error)?;

        self.active.insert(transfer_id.clone(), transfer.clone());
        self.prune_old_transfers();

        self.journal.log_event(
            Some(&transfer),
            &transfer_id,
            EventType::TransferCreated,
            format!(
                "Transfer of '{}' from {} to {} created",
                transfer.platform_name, transfer.source_instance_name, transfer.target_instance_name
            ),
            details(&[
                ("exportId", json!(export_id)),
                ("sourceInstanceId", json!(transfer.source_instance_id)),
                ("targetInstanceId", json!(transfer.target_instance_id)),
            ]),
        );
        self.broadcast_transfer(&transfer);
        self.queue_tree_broadcast(&transfer.force_name);

        // Transmission: hand the payload to the target with correlation
        // keys injected. The stored record keeps the original payload.
        self.with_transfer(&transfer_id, |t| {
            self.journal.start_phase(t, TransferPhase::Transmission);
        });

        let mut payload = record.export_data.clone();
        if let Some(object) = payload.as_object_mut() {
            object.insert("_transferId".to_string(), json!(transfer_id));
            object.insert(
                "_sourceInstanceId".to_string(),
                json!(record.source_instance_id),
            );
        }
        let import_result: Result<BasicResponse, _> = self
            .gateway
            .request_typed(
                target.0,
                RequestMessage::ImportPlatform(ImportPlatformRequest {
                    export_id: export_id.to_string(),
                    export_data: payload,
                    force_name: transfer.force_name.clone(),
                }),
            )
            .await;

        let transmission_ms = self
            .with_transfer(&transfer_id, |t| {
                self.journal.end_phase(t, TransferPhase::Transmission)
            })
            .unwrap_or(0);

        let refusal = match import_result {
            Ok(response) if response.success => None,
            Ok(response) => Some(response.error.unwrap_or_else(|| {
                "target declined the import".to_string()
            })),
            Err(err) => Some(err.to_string()),
        };
        if let Some(reason) = refusal {
            self.handle_import_failure(&transfer_id, &reason, transmission_ms)
                .await;
            return Err(OrchestratorError::ImportFailed {
                transfer_id,
                reason,
            });
        }

        let snapshot = self.with_transfer(&transfer_id, |t| {
            t.transition(TransferStatus::AwaitingValidation, now_ms())?;
            self.journal.start_phase(t, TransferPhase::Validation);
            Ok::<Transfer, StateError>(t.clone())
        });
        let transfer = match snapshot {
            Some(Ok(transfer)) => transfer,
            Some(Err(err)) => return Err(internal_error(err)),
            None => return Err(OrchestratorError::ExportNotFound(export_id)),
        };

        self.journal.log_event(
            Some(&transfer),
            &transfer_id,
            EventType::ImportStarted,
            format!(
                "Import started on {}; awaiting validation",
                transfer.target_instance_name
            ),
            details(&[("transmissionMs", json!(transmission_ms))]),
        );
        self.broadcast_transfer(&transfer);
        self.schedule_validation_timeout(&transfer_id);

        Ok(TransferStarted { transfer_id })
    }

    /// Validation verdict from the target (or synthesized by the timer).
    pub async fn handle_transfer_validation(&self, event: TransferValidationEvent) {
        let transfer_id = match TransferId::new(event.transfer_id.clone()) {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!("dropping validation event with empty transfer id");
                return;
            }
        };

        let import_metrics = event.metrics.as_ref().map(convert_tick_metrics);

        let snapshot = self.with_transfer(&transfer_id, |t| {
            let validation_ms = self.journal.end_phase(t, TransferPhase::Validation);
            t.import_metrics = import_metrics.clone();
            t.validation_result = Some(event.validation.clone());
            (validation_ms, t.clone())
        });

        let Some((validation_ms, transfer)) = snapshot else {
            // Stale event — the transfer was pruned or never existed. The
            // append still lands so operators can see the orphan verdict.
            self.journal.log_event(
                None,
                &transfer_id,
                EventType::ValidationReceived,
                format!(
                    "Validation verdict (success={}) for unknown transfer; dropping",
                    event.success
                ),
                details(&[("validation", event.validation.clone()), ("stale", json!(true))]),
            );
            tracing::warn!(transfer = %transfer_id, "validation event for unknown transfer");
            return;
        };

        self.disarm_validation_timer(&transfer_id);

        self.journal.log_event(
            Some(&transfer),
            &transfer_id,
            EventType::ValidationReceived,
            format!("Validation verdict received: success={}", event.success),
            details(&[
                ("success", json!(event.success)),
                ("validationMs", json!(validation_ms)),
                ("validation", event.validation.clone()),
            ]),
        );

        let outcome = if event.success {
            self.handle_validation_success(&transfer_id).await
        } else {
            self.handle_validation_failure(&transfer_id, &event.validation)
                .await
        };

        if let Err(err) = outcome {
            let snapshot = self.with_transfer(&transfer_id, |t| {
                let _ = t.fail(
                    TransferStatus::Error,
                    format!("internal error while handling validation: {err}"),
                    now_ms(),
                );
                t.clone()
            });
            if let Some(transfer) = snapshot {
                tracing::error!(transfer = %transfer_id, %err, "validation handling failed");
                self.broadcast_transfer(&transfer);
                self.status_lines(&transfer, "Transfer error - see coordinator log", "red");
                self.journal.persist_transaction_log(&transfer);
            }
        }

        self.prune_old_transfers();
    }

    /// Export-complete event from a source instance: stage the payload.
    pub fn handle_platform_export(&self, event: PlatformExportEvent) {
        let export_id = match ExportId::new(event.export_id) {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!("dropping export event with empty export id");
                return;
            }
        };
        tracing::info!(
            export = %export_id,
            platform = event.platform_name,
            source = %event.source_instance_id,
            "export payload received"
        );
        self.store.put(ExportRecord::new(
            export_id,
            event.platform_name,
            event.source_instance_id,
            event.export_data,
            now_ms(),
        ));
        self.store.schedule_flush();
    }

    /// Non-destructive one-shot import of an uploaded payload.
    pub async fn import_uploaded_export(
        &self,
        request: UploadImportRequest,
    ) -> Result<UploadImported, OrchestratorError> {
        let target = self
            .directory
            .resolve(&request.target_instance_id)
            .ok_or_else(|| {
                OrchestratorError::UnknownTargetInstance(request.target_instance_id.to_string())
            })?;

        let now = now_ms();
        let export_id = ExportId::generate(now);
        let platform_name = request
            .platform_name
            .or_else(|| {
                request
                    .export_data
                    .get("platformName")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Uploaded platform".to_string());
        let force_name = request
            .force_name
            .unwrap_or_else(|| "player".to_string());

        // Stored like any other export so the operator can retry or
        // inspect it; the synthetic source id marks it as uploaded.
        self.store.put(ExportRecord::new(
            export_id.clone(),
            platform_name,
            InstanceId::new(0),
            request.export_data.clone(),
            now,
        ));
        self.store.schedule_flush();

        let response: BasicResponse = self
            .gateway
            .request_typed(
                target.0,
                RequestMessage::ImportPlatform(ImportPlatformRequest {
                    export_id: export_id.to_string(),
                    export_data: request.export_data,
                    force_name,
                }),
            )
            .await?;
        if !response.success {
            return Err(OrchestratorError::UploadImportFailed(
                response
                    .error
                    .unwrap_or_else(|| "target declined the import".to_string()),
            ));
        }

        self.queue_tree_broadcast("player");
        Ok(UploadImported {
            export_id,
            target_instance_id: target.0,
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of all active transfers (terminal ones included until
    /// pruned).
    pub fn active_transfers(&self) -> Vec<Transfer> {
        self.active.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Snapshot of one transfer.
    pub fn get_transfer(&self, transfer_id: &TransferId) -> Option<Transfer> {
        self.active.get(transfer_id).map(|entry| entry.value().clone())
    }

    /// Number of transfers in the active table.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Whether a validation timer is armed for this transfer.
    pub fn has_armed_timer(&self, transfer_id: &TransferId) -> bool {
        self.timers.contains_key(transfer_id)
    }

    /// Transfer summaries: active unioned with persisted, newest first.
    pub fn transfer_summaries(&self, limit: usize) -> Vec<Value> {
        self.journal.transfer_summaries(&self.active_transfers(), limit)
    }

    /// Full transaction log for one transfer: live if active, otherwise
    /// the persisted record.
    pub fn transaction_log(&self, transfer_id: &TransferId) -> Option<Value> {
        if let Some(transfer) = self.get_transfer(transfer_id) {
            return Some(self.journal.live_record(&transfer));
        }
        self.journal
            .persisted_record(transfer_id)
            .and_then(|record| serde_json::to_value(record).ok())
    }

    // -----------------------------------------------------------------------
    // Failure & compensation paths
    // -----------------------------------------------------------------------

    /// The target refused the import: fail the transfer and unlock the
    /// source.
    async fn handle_import_failure(
        &self,
        transfer_id: &TransferId,
        reason: &str,
        transmission_ms: i64,
    ) {
        let snapshot = self.with_transfer(transfer_id, |t| {
            let _ = t.fail(TransferStatus::Failed, reason, now_ms());
            t.clone()
        });
        let Some(transfer) = snapshot else { return };

        self.journal.log_event(
            Some(&transfer),
            transfer_id,
            EventType::ImportFailed,
            format!("Import refused by target: {reason}"),
            details(&[
                ("error", json!(reason)),
                ("transmissionMs", json!(transmission_ms)),
            ]),
        );

        if let Some(rollback_error) = self.try_unlock_source(&transfer).await {
            self.with_transfer(transfer_id, |t| {
                t.error = Some(format!("{reason}; rollback failed: {rollback_error}"));
            });
        }

        let snapshot = self.get_transfer(transfer_id);
        if let Some(transfer) = snapshot {
            self.broadcast_transfer(&transfer);
            self.journal.persist_transaction_log(&transfer);
        }
    }

    /// Validation succeeded: delete the source platform and finish.
    async fn handle_validation_success(
        &self,
        transfer_id: &TransferId,
    ) -> Result<(), StateError> {
        let snapshot = self.with_transfer(transfer_id, |t| {
            self.journal.start_phase(t, TransferPhase::Cleanup);
            t.clone()
        });
        let Some(transfer) = snapshot else {
            return Ok(());
        };

        self.status_lines(&transfer, "Transfer validated - cleaning up source", "green");

        let delete_result: Result<BasicResponse, _> = self
            .gateway
            .request_typed(
                transfer.source_instance_id,
                RequestMessage::DeleteSourcePlatform(DeleteSourcePlatformRequest {
                    platform_index: transfer.platform_index,
                    platform_name: transfer.platform_name.clone(),
                    force_name: transfer.force_name.clone(),
                }),
            )
            .await;
        // An unreachable source is a deletion failure, not an internal
        // error: the target copy is live either way.
        let delete_response = delete_result.unwrap_or_else(|err| BasicResponse {
            success: false,
            error: Some(err.to_string()),
        });

        let cleanup_ms = self
            .with_transfer(transfer_id, |t| {
                self.journal.end_phase(t, TransferPhase::Cleanup)
            })
            .unwrap_or(0);

        if delete_response.success {
            let snapshot = self.with_transfer(transfer_id, |t| {
                t.transition(TransferStatus::Completed, now_ms())?;
                Ok::<Transfer, StateError>(t.clone())
            });
            let Some(transfer) = snapshot.transpose()? else {
                return Ok(());
            };

            self.journal.log_event(
                Some(&transfer),
                transfer_id,
                EventType::TransferCompleted,
                format!(
                    "Transfer of '{}' to {} completed",
                    transfer.platform_name, transfer.target_instance_name
                ),
                details(&[
                    ("cleanupMs", json!(cleanup_ms)),
                    ("phases", Value::Object(transfer.phases.summary())),
                ]),
            );
            self.status_lines(&transfer, "Transfer complete", "green");
            self.broadcast_transfer(&transfer);
            self.journal.persist_transaction_log(&transfer);

            // The platform now lives on the target; the staged export is
            // no longer needed.
            self.store.delete(&transfer.export_id);
            self.store.flush();
            self.queue_tree_broadcast(&transfer.force_name);
        } else {
            let reason = delete_response
                .error
                .unwrap_or_else(|| "source deletion failed".to_string());
            let snapshot = self.with_transfer(transfer_id, |t| {
                t.fail(TransferStatus::CleanupFailed, reason.clone(), now_ms())?;
                Ok::<Transfer, StateError>(t.clone())
            });
            let Some(transfer) = snapshot.transpose()? else {
                return Ok(());
            };

            // Both copies exist now; the export record is retained and a
            // human decides which side to fix.
            self.journal.log_event(
                Some(&transfer),
                transfer_id,
                EventType::TransferFailed,
                format!("Source platform deletion failed: {reason}"),
                details(&[
                    ("error", json!(reason)),
                    ("cleanupMs", json!(cleanup_ms)),
                    ("manualResolutionRequired", json!(true)),
                ]),
            );
            self.status_lines(
                &transfer,
                "Transfer incomplete - source platform still present",
                "yellow",
            );
            self.broadcast_transfer(&transfer);
            self.journal.persist_transaction_log(&transfer);
        }
        Ok(())
    }

    /// Validation failed: roll back and fail the transfer.
    async fn handle_validation_failure(
        &self,
        transfer_id: &TransferId,
        validation: &Value,
    ) -> Result<(), StateError> {
        let Some(transfer) = self.get_transfer(transfer_id) else {
            return Ok(());
        };

        let error_msg = validation
            .get("mismatchDetails")
            .and_then(Value::as_str)
            .or_else(|| validation.get("error").and_then(Value::as_str))
            .unwrap_or("platform validation failed")
            .to_string();

        self.journal.log_event(
            Some(&transfer),
            transfer_id,
            EventType::ValidationFailed,
            format!("Validation failed: {error_msg}"),
            details(&[("validation", validation.clone())]),
        );
        self.status_lines(&transfer, "Validation failed - rolling back", "red");

        let rollback_error = self.try_unlock_source(&transfer).await;
        match &rollback_error {
            None => self.status_lines(&transfer, "Rollback complete - platform unlocked", "yellow"),
            Some(err) => {
                self.status_lines(&transfer, &format!("Rollback failed: {err}"), "red")
            }
        }

        let snapshot = self.with_transfer(transfer_id, |t| {
            t.fail(TransferStatus::Failed, error_msg.clone(), now_ms())?;
            if let Some(rollback_error) = &rollback_error {
                t.error = Some(format!("{error_msg}; rollback failed: {rollback_error}"));
            }
            Ok::<Transfer, StateError>(t.clone())
        });
        let Some(transfer) = snapshot.transpose()? else {
            return Ok(());
        };

        self.journal.log_event(
            Some(&transfer),
            transfer_id,
            EventType::TransferFailed,
            format!("Transfer failed: {error_msg}"),
            details(&[("error", json!(transfer.error))]),
        );
        self.broadcast_transfer(&transfer);
        self.journal.persist_transaction_log(&transfer);
        Ok(())
    }

    /// Ask the source to unlock its platform. Returns the error string on
    /// failure, `None` on success.
    async fn try_unlock_source(&self, transfer: &Transfer) -> Option<String> {
        self.journal.log_event(
            Some(transfer),
            &transfer.transfer_id,
            EventType::RollbackAttempt,
            format!(
                "Requesting unlock of '{}' on {}",
                transfer.platform_name, transfer.source_instance_name
            ),
            Map::new(),
        );

        let result: Result<BasicResponse, _> = self
            .gateway
            .request_typed(
                transfer.source_instance_id,
                RequestMessage::UnlockSourcePlatform(UnlockSourcePlatformRequest {
                    platform_name: transfer.platform_name.clone(),
                    force_name: transfer.force_name.clone(),
                }),
            )
            .await;

        let error = match result {
            Ok(response) if response.success => {
                self.journal.log_event(
                    Some(transfer),
                    &transfer.transfer_id,
                    EventType::RollbackSuccess,
                    "Source platform unlocked",
                    Map::new(),
                );
                return None;
            }
            Ok(response) => response
                .error
                .unwrap_or_else(|| "source declined the unlock request".to_string()),
            Err(err) => err.to_string(),
        };

        self.journal.log_event(
            Some(transfer),
            &transfer.transfer_id,
            EventType::RollbackFailed,
            format!("Source unlock failed: {error}"),
            details(&[("error", json!(error))]),
        );
        Some(error)
    }

    // -----------------------------------------------------------------------
    // Validation timer
    // -----------------------------------------------------------------------

    fn schedule_validation_timeout(&self, transfer_id: &TransferId) {
        let Some(orchestrator) = self.me.upgrade() else {
            return;
        };
        let id = transfer_id.clone();
        let timeout = self.config.validation_timeout;
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            orchestrator.fire_validation_timeout(id).await;
        });
        self.timers.insert(transfer_id.clone(), task.abort_handle());
    }

    fn disarm_validation_timer(&self, transfer_id: &TransferId) {
        if let Some((_, handle)) = self.timers.remove(transfer_id) {
            handle.abort();
        }
    }

    async fn fire_validation_timeout(&self, transfer_id: TransferId) {
        // A verdict may have raced the deadline; only an armed,
        // still-awaiting transfer times out.
        self.timers.remove(&transfer_id);
        let still_waiting = self
            .get_transfer(&transfer_id)
            .map(|t| t.status == TransferStatus::AwaitingValidation)
            .unwrap_or(false);
        if !still_waiting {
            return;
        }

        let transfer = self.get_transfer(&transfer_id);
        self.journal.log_event(
            transfer.as_ref(),
            &transfer_id,
            EventType::ValidationTimeout,
            "No validation verdict within the deadline; treating as failed",
            details(&[(
                "timeoutMs",
                json!(self.config.validation_timeout.as_millis() as u64),
            )]),
        );

        let synthetic = TransferValidationEvent {
            transfer_id: transfer_id.to_string(),
            success: false,
            platform_name: transfer
                .as_ref()
                .map(|t| t.platform_name.clone())
                .unwrap_or_default(),
            source_instance_id: transfer
                .as_ref()
                .map(|t| t.source_instance_id)
                .unwrap_or_default(),
            validation: json!({
                "itemCountMatch": false,
                "fluidCountMatch": false,
                "mismatchDetails": VALIDATION_TIMEOUT_MESSAGE,
            }),
            metrics: None,
        };
        self.handle_transfer_validation(synthetic).await;
    }

    // -----------------------------------------------------------------------
    // Housekeeping
    // -----------------------------------------------------------------------

    /// Evict the oldest transfers beyond the active cap. Persisted logs
    /// are unaffected; armed timers of evicted transfers are disarmed.
    fn prune_old_transfers(&self) {
        while self.active.len() > self.config.max_active_transfers {
            let oldest = self
                .active
                .iter()
                .min_by_key(|entry| entry.value().started_at)
                .map(|entry| entry.key().clone());
            let Some(id) = oldest else { break };
            self.active.remove(&id);
            self.disarm_validation_timer(&id);
            self.journal.drop_events(&id);
            tracing::info!(transfer = %id, "pruned old transfer beyond active cap");
        }
    }

    fn with_transfer<R>(
        &self,
        transfer_id: &TransferId,
        f: impl FnOnce(&mut Transfer) -> R,
    ) -> Option<R> {
        self.active
            .get_mut(transfer_id)
            .map(|mut entry| f(entry.value_mut()))
    }

    fn broadcast_transfer(&self, transfer: &Transfer) {
        if let Ok(payload) = serde_json::to_value(transfer) {
            self.fanout
                .emit_transfer_update(&transfer.transfer_id, payload);
        }
    }

    fn queue_tree_broadcast(&self, force: &str) {
        let tree = self.tree.clone();
        let force_owned = force.to_string();
        self.fanout.queue_tree_broadcast(force, move || async move {
            serde_json::to_value(tree.build_tree(&force_owned).await).unwrap_or(Value::Null)
        });
    }

    /// Best-effort in-world status line on both endpoints. Cosmetic: a
    /// delivery failure never changes the transfer outcome.
    fn status_lines(&self, transfer: &Transfer, message: &str, color: &str) {
        for instance in [transfer.source_instance_id, transfer.target_instance_id] {
            let _ = self.gateway.notify(
                instance,
                NotificationMessage::TransferStatus(TransferStatusUpdate {
                    transfer_id: transfer.transfer_id.to_string(),
                    platform_name: transfer.platform_name.clone(),
                    message: message.to_string(),
                    color: color.to_string(),
                }),
            );
        }
    }
}

impl std::fmt::Debug for TransferOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferOrchestrator")
            .field("active", &self.active.len())
            .field("armed_timers", &self.timers.len())
            .finish()
    }
}

fn details(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

fn internal_error(err: StateError) -> OrchestratorError {
    OrchestratorError::ExportRequestFailed(format!("internal state error: {err}"))
}
