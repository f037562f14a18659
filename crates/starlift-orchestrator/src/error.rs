//! # Orchestrator Errors
//!
//! Operator-input failures are rejected here with specific messages and
//! never create a transfer record. Instance-side failures during a running
//! saga are captured into the transfer state instead of propagating — the
//! variants below that carry a transfer id exist so the API layer can
//! report the outcome of the call that started the saga.

use starlift_core::{ExportId, InstanceId, TransferId};
use starlift_gateway::GatewayError;
use thiserror::Error;

/// Errors surfaced to operators from orchestrator operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The source instance id is not in the directory.
    #[error("source instance {0} not found")]
    UnknownSourceInstance(InstanceId),

    /// The source instance exists but has no live connection.
    #[error("source instance {0} is not connected")]
    SourceNotConnected(InstanceId),

    /// The target reference did not resolve to a known instance.
    #[error("target instance '{0}' not found")]
    UnknownTargetInstance(String),

    /// Source and target are the same instance.
    #[error("source and target instance must differ")]
    SameInstance,

    /// Platform indexes are 1-based.
    #[error("platform index must be a positive integer, got {0}")]
    InvalidPlatformIndex(u32),

    /// No stored export under the given id.
    #[error("export {0} not found")]
    ExportNotFound(ExportId),

    /// The source instance refused the export request.
    #[error("export request failed: {0}")]
    ExportRequestFailed(String),

    /// The export payload never appeared in the store.
    #[error("export {export_id} was not stored within {waited_ms}ms")]
    ExportWaitTimeout {
        /// The export that never arrived.
        export_id: ExportId,
        /// How long the orchestrator polled.
        waited_ms: u64,
    },

    /// The target refused the import; the transfer record exists in the
    /// `failed` state with rollback already attempted.
    #[error("import failed: {reason}")]
    ImportFailed {
        /// The failed transfer.
        transfer_id: TransferId,
        /// The target's refusal reason.
        reason: String,
    },

    /// A one-shot uploaded-payload import was refused by the target.
    #[error("uploaded import failed: {0}")]
    UploadImportFailed(String),

    /// Transport failure talking to an instance.
    #[error(transparent)]
    Rpc(#[from] GatewayError),
}
