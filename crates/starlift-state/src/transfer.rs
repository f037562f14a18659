//! # Transfer Record
//!
//! The serializable record the orchestrator drives through the saga. All
//! state changes go through [`Transfer::transition`], which enforces the
//! legal-transition table and keeps the terminal timestamps consistent:
//! `started_at` is set exactly once at creation, `completed_at` only on
//! `completed`, `failed_at` only on `failed` / `cleanup_failed` / `error`.
//!
//! The armed validation timer is deliberately NOT part of this record — it
//! is a runtime handle the orchestrator keeps in a side table, so the
//! record itself stays serializable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use starlift_core::{ExportId, InstanceId, TransferId};

use crate::phase::PhaseTimings;
use crate::status::{StateError, TransferStatus};

/// A platform transfer in flight (or finished).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    /// Unique transfer identifier.
    pub transfer_id: TransferId,
    /// The stored export this transfer ships.
    pub export_id: ExportId,
    /// Platform display name.
    pub platform_name: String,
    /// Platform slot index on the source instance (1-based).
    pub platform_index: u32,
    /// Owning force of the platform.
    pub force_name: String,
    /// Source instance id.
    pub source_instance_id: InstanceId,
    /// Source instance name, resolved at creation.
    pub source_instance_name: String,
    /// Target instance id.
    pub target_instance_id: InstanceId,
    /// Target instance name, resolved at creation.
    pub target_instance_name: String,
    /// Current saga state.
    pub status: TransferStatus,
    /// Creation time (epoch ms). Set exactly once.
    pub started_at: i64,
    /// Set when the transfer reaches `completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    /// Set when the transfer reaches `failed`, `cleanup_failed`, or `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<i64>,
    /// Terminal failure reason, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Phase timing table.
    #[serde(default)]
    pub phases: PhaseTimings,
    /// Export-side timing metrics (opaque passthrough).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_metrics: Option<Value>,
    /// Payload shape metrics extracted for display (opaque passthrough).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_metrics: Option<Value>,
    /// Target-side import metrics (opaque passthrough, tick fields
    /// converted to milliseconds on receipt).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_metrics: Option<Value>,
    /// Raw validation verdict detail from the target (opaque passthrough).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<Value>,
    /// Source-side verification detail (opaque passthrough).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_verification: Option<Value>,
}

impl Transfer {
    /// Allocate a new transfer record in the transient `creating` state.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transfer_id: TransferId,
        export_id: ExportId,
        platform_name: String,
        platform_index: u32,
        force_name: String,
        source: (InstanceId, String),
        target: (InstanceId, String),
        started_at: i64,
    ) -> Self {
        Self {
            transfer_id,
            export_id,
            platform_name,
            platform_index,
            force_name,
            source_instance_id: source.0,
            source_instance_name: source.1,
            target_instance_id: target.0,
            target_instance_name: target.1,
            status: TransferStatus::Creating,
            started_at,
            completed_at: None,
            failed_at: None,
            error: None,
            phases: PhaseTimings::new(),
            export_metrics: None,
            payload_metrics: None,
            import_metrics: None,
            validation_result: None,
            source_verification: None,
        }
    }

    /// Move the transfer to `to`, enforcing the legal-transition table and
    /// stamping terminal timestamps.
    pub fn transition(&mut self, to: TransferStatus, now_ms: i64) -> Result<(), StateError> {
        if self.status.is_terminal() {
            return Err(StateError::AlreadyTerminal {
                id: self.transfer_id.to_string(),
                state: self.status,
            });
        }
        if !self.status.can_transition_to(to) {
            return Err(StateError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        self.status = to;
        match to {
            TransferStatus::Completed => self.completed_at = Some(now_ms),
            TransferStatus::Failed | TransferStatus::CleanupFailed | TransferStatus::Error => {
                self.failed_at = Some(now_ms);
            }
            _ => {}
        }
        Ok(())
    }

    /// Move to a terminal failure state with a reason.
    pub fn fail(
        &mut self,
        to: TransferStatus,
        error: impl Into<String>,
        now_ms: i64,
    ) -> Result<(), StateError> {
        debug_assert!(matches!(
            to,
            TransferStatus::Failed | TransferStatus::CleanupFailed | TransferStatus::Error
        ));
        self.transition(to, now_ms)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Whether the transfer has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The instant the transfer reached its terminal state, if it has.
    pub fn terminal_at(&self) -> Option<i64> {
        self.completed_at.or(self.failed_at)
    }
}
