//! # Instance Message Set
//!
//! The RPCs the coordinator issues to instances, the events instances send
//! back, and their typed (tolerant) response shapes. Message type tags on
//! the wire match the plugin message names (`ExportPlatformRequest`,
//! `PlatformExportEvent`, …).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use starlift_core::InstanceId;

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// First frame an instance sends after connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstanceHello {
    /// The connecting instance's id.
    pub instance_id: InstanceId,
    /// The connecting instance's display name.
    pub instance_name: String,
    /// Shared-secret token; required when the coordinator has auth enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// Coordinator → instance requests
// ---------------------------------------------------------------------------

/// All requests the coordinator can issue to an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RequestMessage {
    /// Trigger an export of a platform on its source instance.
    #[serde(rename = "ExportPlatformRequest")]
    ExportPlatform(ExportPlatformRequest),
    /// Enumerate platforms on an instance.
    #[serde(rename = "InstanceListPlatformsRequest")]
    ListPlatforms(InstanceListPlatformsRequest),
    /// Hand an export payload to a target instance for import.
    #[serde(rename = "ImportPlatformRequest")]
    ImportPlatform(ImportPlatformRequest),
    /// Delete the source platform after a validated transfer.
    #[serde(rename = "DeleteSourcePlatformRequest")]
    DeleteSourcePlatform(DeleteSourcePlatformRequest),
    /// Unlock the source platform when a transfer is rolled back.
    #[serde(rename = "UnlockSourcePlatformRequest")]
    UnlockSourcePlatform(UnlockSourcePlatformRequest),
}

/// Trigger an export on the source instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExportPlatformRequest {
    /// Platform slot index (1-based).
    pub platform_index: u32,
    /// Owning force of the platform.
    pub force_name: String,
}

/// Response to [`ExportPlatformRequest`]. Forward-compatible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPlatformResponse {
    /// Whether the instance accepted the export request.
    pub success: bool,
    /// The export id the instance will publish the payload under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_id: Option<String>,
    /// Failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Enumerate platforms on an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstanceListPlatformsRequest {
    /// The force whose platforms to enumerate.
    pub force_name: String,
}

/// One platform in an instance's enumeration response.
///
/// Only the index and name are interpreted; everything else the instance
/// reports rides along untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    /// Platform slot index (1-based).
    pub platform_index: u32,
    /// Platform display name.
    pub platform_name: String,
    /// Additional instance-reported fields, passed through verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Hand off an export payload for import on the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportPlatformRequest {
    /// The export being imported.
    pub export_id: String,
    /// The opaque export payload, with `_transferId` and
    /// `_sourceInstanceId` correlation keys injected by the orchestrator.
    pub export_data: Value,
    /// Force the platform belongs to.
    pub force_name: String,
}

/// Delete the source platform after a validated transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteSourcePlatformRequest {
    /// Platform slot index (1-based).
    pub platform_index: u32,
    /// Platform display name.
    pub platform_name: String,
    /// Owning force.
    pub force_name: String,
}

/// Unlock the source platform when a transfer rolls back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnlockSourcePlatformRequest {
    /// Platform display name.
    pub platform_name: String,
    /// Owning force.
    pub force_name: String,
}

/// Generic success/error response used by import, delete, and unlock.
/// Forward-compatible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Notifications (no response)
// ---------------------------------------------------------------------------

/// Fire-and-forget messages the coordinator pushes to instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NotificationMessage {
    /// Cosmetic in-world status line. Delivery is best-effort; a lost
    /// status line never changes a transfer outcome.
    #[serde(rename = "TransferStatusUpdate")]
    TransferStatus(TransferStatusUpdate),
}

/// Cosmetic in-world status line shown on an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransferStatusUpdate {
    /// The transfer this status line belongs to.
    pub transfer_id: String,
    /// Platform display name.
    pub platform_name: String,
    /// Status text to show.
    pub message: String,
    /// Display color hint (e.g. `green`, `red`, `yellow`).
    pub color: String,
}

// ---------------------------------------------------------------------------
// Instance → coordinator events
// ---------------------------------------------------------------------------

/// Unsolicited events instances send to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventMessage {
    /// An export finished; the payload is attached.
    #[serde(rename = "PlatformExportEvent")]
    PlatformExport(PlatformExportEvent),
    /// A target instance finished validating an imported platform.
    #[serde(rename = "TransferValidationEvent")]
    TransferValidation(TransferValidationEvent),
}

/// Export-complete event from a source instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformExportEvent {
    /// Globally unique export id.
    pub export_id: String,
    /// Platform display name.
    pub platform_name: String,
    /// The instance that produced the export.
    pub source_instance_id: InstanceId,
    /// The opaque export payload.
    pub export_data: Value,
}

/// Validation verdict from a target instance after an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferValidationEvent {
    /// The transfer being validated (correlation token from the import).
    pub transfer_id: String,
    /// Whether the imported platform passed validation.
    pub success: bool,
    /// Platform display name.
    #[serde(default)]
    pub platform_name: String,
    /// The source instance of the transfer.
    #[serde(default)]
    pub source_instance_id: InstanceId,
    /// Validation detail (item/fluid count matches, mismatch text, …).
    /// Opaque passthrough.
    #[serde(default)]
    pub validation: Value,
    /// Raw import metrics; tick-valued fields are converted to
    /// milliseconds by the orchestrator on receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
}
