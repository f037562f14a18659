// SPDX-License-Identifier: BUSL-1.1
//! # starlift-orchestrator — The Transfer Saga
//!
//! Drives a platform transfer through its full lifecycle:
//!
//! ```text
//! export on source → stage in store → import on target
//!     → await validation (timer armed) → delete source → completed
//! ```
//!
//! with explicit compensation on every failure edge: refused imports and
//! failed validations unlock the source platform; a failed source deletion
//! after a successful validation parks the transfer in `cleanup_failed`
//! for manual resolution (the target copy is authoritative).
//!
//! Every transition appends a transaction-log event, pushes a live update
//! to subscribers, and lands in the persisted log window. Instance-side
//! failures are captured into transfer state — an RPC error mid-saga never
//! unwinds the coordinator.

pub mod error;
pub mod metrics;
pub mod orchestrator;

pub use error::OrchestratorError;
pub use metrics::{convert_tick_metrics, extract_payload_metrics, TICK_MS};
pub use orchestrator::{
    OrchestratorConfig, StartTransferRequest, TransferOrchestrator, TransferStarted,
    UploadImportRequest, UploadImported, VALIDATION_TIMEOUT_MESSAGE,
};
