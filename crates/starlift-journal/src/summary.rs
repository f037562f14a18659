//! # Transfer Summaries
//!
//! Two derived views of a transfer record: the minimal summary used by
//! list endpoints and the detailed summary embedded in persisted
//! transaction logs. Both report the canonical status names (the legacy
//! `importing` spelling never survives normalization on read, so writes
//! are always canonical).

use serde_json::{json, Value};

use starlift_core::format_duration_ms;
use starlift_state::{Transfer, TransferResult};

/// Minimal summary for list views.
pub fn transfer_summary(transfer: &Transfer) -> Value {
    json!({
        "transferId": transfer.transfer_id,
        "exportId": transfer.export_id,
        "platformName": transfer.platform_name,
        "platformIndex": transfer.platform_index,
        "forceName": transfer.force_name,
        "sourceInstanceId": transfer.source_instance_id,
        "sourceInstanceName": transfer.source_instance_name,
        "targetInstanceId": transfer.target_instance_id,
        "targetInstanceName": transfer.target_instance_name,
        "status": transfer.status,
        "result": TransferResult::from(transfer.status),
        "startedAt": transfer.started_at,
    })
}

/// Rich summary for persisted logs and detail views.
///
/// `last_event_at` is the newest event timestamp in the transfer's log
/// stream, used as the duration endpoint for transfers that died without
/// a terminal timestamp; `now_ms` is the final fallback for transfers
/// still in flight.
pub fn detailed_transfer_summary(
    transfer: &Transfer,
    last_event_at: Option<i64>,
    now_ms: i64,
) -> Value {
    let result = TransferResult::from(transfer.status);
    let end = transfer
        .terminal_at()
        .or(last_event_at)
        .unwrap_or(now_ms);
    let total_duration_ms = (end - transfer.started_at).max(0);

    let mut summary = serde_json::Map::new();
    summary.insert("transferId".to_string(), json!(transfer.transfer_id));
    summary.insert("exportId".to_string(), json!(transfer.export_id));
    summary.insert("platformName".to_string(), json!(transfer.platform_name));
    summary.insert("platformIndex".to_string(), json!(transfer.platform_index));
    summary.insert("forceName".to_string(), json!(transfer.force_name));
    summary.insert(
        "sourceInstanceId".to_string(),
        json!(transfer.source_instance_id),
    );
    summary.insert(
        "sourceInstanceName".to_string(),
        json!(transfer.source_instance_name),
    );
    summary.insert(
        "targetInstanceId".to_string(),
        json!(transfer.target_instance_id),
    );
    summary.insert(
        "targetInstanceName".to_string(),
        json!(transfer.target_instance_name),
    );
    summary.insert("status".to_string(), json!(transfer.status));
    summary.insert("result".to_string(), json!(result));
    summary.insert("startedAt".to_string(), json!(transfer.started_at));
    summary.insert("totalDurationMs".to_string(), json!(total_duration_ms));
    summary.insert(
        "totalDuration".to_string(),
        json!(format_duration_ms(total_duration_ms)),
    );
    summary.insert(
        "phases".to_string(),
        Value::Object(transfer.phases.summary()),
    );

    if let Some(completed_at) = transfer.completed_at {
        summary.insert("completedAt".to_string(), json!(completed_at));
    }
    if let Some(failed_at) = transfer.failed_at {
        summary.insert("failedAt".to_string(), json!(failed_at));
    }
    if let Some(error) = &transfer.error {
        summary.insert("error".to_string(), json!(error));
    }
    if let Some(export_metrics) = &transfer.export_metrics {
        summary.insert("exportMetrics".to_string(), export_metrics.clone());
    }
    if let Some(payload_metrics) = &transfer.payload_metrics {
        summary.insert("payloadMetrics".to_string(), payload_metrics.clone());
    }
    if let Some(import_metrics) = &transfer.import_metrics {
        summary.insert("importMetrics".to_string(), import_metrics.clone());
    }
    if let Some(validation_result) = &transfer.validation_result {
        summary.insert("validationResult".to_string(), validation_result.clone());
    }
    if let Some(source_verification) = &transfer.source_verification {
        summary.insert(
            "sourceVerification".to_string(),
            source_verification.clone(),
        );
    }

    Value::Object(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlift_core::{ExportId, InstanceId, TransferId};
    use starlift_state::{TransferPhase, TransferStatus};

    fn transfer() -> Transfer {
        Transfer::new(
            TransferId::new("transfer_1000_aa").unwrap(),
            ExportId::new("E_A").unwrap(),
            "Aurora".to_string(),
            3,
            "player".to_string(),
            (InstanceId::new(1), "alpha".to_string()),
            (InstanceId::new(2), "beta".to_string()),
            1_000,
        )
    }

    #[test]
    fn minimal_summary_carries_coordinates() {
        let summary = transfer_summary(&transfer());
        assert_eq!(summary["transferId"], "transfer_1000_aa");
        assert_eq!(summary["sourceInstanceName"], "alpha");
        assert_eq!(summary["targetInstanceId"], 2);
        assert_eq!(summary["status"], "creating");
        assert_eq!(summary["result"], "IN_PROGRESS");
    }

    #[test]
    fn completed_transfer_summarizes_success() {
        let mut t = transfer();
        t.transition(TransferStatus::Transporting, 1_001).unwrap();
        t.phases.open(TransferPhase::Transmission, 1_001);
        t.phases.close(TransferPhase::Transmission, 1_200);
        t.transition(TransferStatus::AwaitingValidation, 1_200)
            .unwrap();
        t.transition(TransferStatus::Cleanup, 2_000).unwrap();
        t.transition(TransferStatus::Completed, 2_400).unwrap();

        let summary = detailed_transfer_summary(&t, Some(2_400), 9_999);
        assert_eq!(summary["result"], "SUCCESS");
        assert_eq!(summary["totalDurationMs"], 1_400);
        assert_eq!(summary["totalDuration"], "1.4s");
        assert_eq!(summary["phases"]["transmissionMs"], 199);
        assert_eq!(summary["completedAt"], 2_400);
        assert!(summary.get("error").is_none());
    }

    #[test]
    fn failed_transfer_summarizes_failure_with_error() {
        let mut t = transfer();
        t.transition(TransferStatus::Transporting, 1_001).unwrap();
        t.fail(TransferStatus::Failed, "incompatible version", 1_500)
            .unwrap();

        let summary = detailed_transfer_summary(&t, None, 9_999);
        assert_eq!(summary["result"], "FAILED");
        assert_eq!(summary["error"], "incompatible version");
        assert_eq!(summary["failedAt"], 1_500);
        assert_eq!(summary["totalDurationMs"], 500);
        assert_eq!(summary["totalDuration"], "500ms");
    }

    #[test]
    fn in_flight_transfer_measures_against_now() {
        let mut t = transfer();
        t.transition(TransferStatus::Transporting, 1_001).unwrap();

        // No terminal timestamp, no events: duration runs to `now`.
        let summary = detailed_transfer_summary(&t, None, 4_000);
        assert_eq!(summary["result"], "IN_PROGRESS");
        assert_eq!(summary["totalDurationMs"], 3_000);

        // With a newer event, the event timestamp wins over `now`.
        let summary = detailed_transfer_summary(&t, Some(2_000), 4_000);
        assert_eq!(summary["totalDurationMs"], 1_000);
    }

    #[test]
    fn duration_clamps_to_zero() {
        let t = transfer();
        // An endpoint before startedAt cannot produce a negative duration.
        let summary = detailed_transfer_summary(&t, Some(500), 500);
        assert_eq!(summary["totalDurationMs"], 0);
    }

    #[test]
    fn metric_blocks_embed_when_present() {
        let mut t = transfer();
        t.payload_metrics = Some(json!({"entityCount": 42}));
        t.import_metrics = Some(json!({"importMs": 333.4}));

        let summary = detailed_transfer_summary(&t, None, 2_000);
        assert_eq!(summary["payloadMetrics"]["entityCount"], 42);
        assert_eq!(summary["importMetrics"]["importMs"], 333.4);
        assert!(summary.get("validationResult").is_none());
    }
}
