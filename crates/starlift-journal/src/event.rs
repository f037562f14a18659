//! # Log Events
//!
//! Every transfer phase boundary, verdict, and rollback step appends one
//! structured event. Events carry both absolute time (ISO + epoch ms) and
//! relative time: `elapsedMs` since the transfer started and `deltaMs`
//! since the previous event in the same stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use starlift_core::iso_from_ms;

/// The fixed taxonomy of transaction-log event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Transfer record created.
    TransferCreated,
    /// Target accepted the import; validation pending.
    ImportStarted,
    /// Target refused the import.
    ImportFailed,
    /// Validation verdict (or synthesized timeout verdict) received.
    ValidationReceived,
    /// Validation reported a mismatch.
    ValidationFailed,
    /// No validation verdict arrived before the deadline.
    ValidationTimeout,
    /// Source unlock requested during rollback.
    RollbackAttempt,
    /// Source unlock succeeded.
    RollbackSuccess,
    /// Source unlock failed.
    RollbackFailed,
    /// Transfer reached `completed`.
    TransferCompleted,
    /// Transfer reached `failed`.
    TransferFailed,
}

impl EventType {
    /// The snake_case wire name of this event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransferCreated => "transfer_created",
            Self::ImportStarted => "import_started",
            Self::ImportFailed => "import_failed",
            Self::ValidationReceived => "validation_received",
            Self::ValidationFailed => "validation_failed",
            Self::ValidationTimeout => "validation_timeout",
            Self::RollbackAttempt => "rollback_attempt",
            Self::RollbackSuccess => "rollback_success",
            Self::RollbackFailed => "rollback_failed",
            Self::TransferCompleted => "transfer_completed",
            Self::TransferFailed => "transfer_failed",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transaction-log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// ISO 8601 form of `timestamp_ms`.
    pub timestamp: String,
    /// When the event was appended (epoch ms).
    pub timestamp_ms: i64,
    /// Milliseconds since the transfer started; 0 when the transfer is
    /// unknown to the logger.
    pub elapsed_ms: i64,
    /// Milliseconds since the previous event in this stream; 0 for the
    /// first event.
    pub delta_ms: i64,
    /// Event taxonomy tag.
    pub event_type: EventType,
    /// Human-readable description.
    pub message: String,
    /// Open payload: phase timings, validation details, metric snapshots.
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl LogEvent {
    /// Build an event at `timestamp_ms` with the given relative timings.
    pub fn new(
        timestamp_ms: i64,
        elapsed_ms: i64,
        delta_ms: i64,
        event_type: EventType,
        message: impl Into<String>,
        details: serde_json::Map<String, Value>,
    ) -> Self {
        Self {
            timestamp: iso_from_ms(timestamp_ms),
            timestamp_ms,
            elapsed_ms,
            delta_ms,
            event_type,
            message: message.into(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_wire_names_are_stable() {
        let expected = [
            (EventType::TransferCreated, "transfer_created"),
            (EventType::ImportStarted, "import_started"),
            (EventType::ImportFailed, "import_failed"),
            (EventType::ValidationReceived, "validation_received"),
            (EventType::ValidationFailed, "validation_failed"),
            (EventType::ValidationTimeout, "validation_timeout"),
            (EventType::RollbackAttempt, "rollback_attempt"),
            (EventType::RollbackSuccess, "rollback_success"),
            (EventType::RollbackFailed, "rollback_failed"),
            (EventType::TransferCompleted, "transfer_completed"),
            (EventType::TransferFailed, "transfer_failed"),
        ];
        for (event_type, name) in expected {
            assert_eq!(event_type.as_str(), name);
            assert_eq!(
                serde_json::to_string(&event_type).unwrap(),
                format!("\"{name}\"")
            );
        }
    }

    #[test]
    fn details_flatten_into_the_event_object() {
        let mut details = serde_json::Map::new();
        details.insert("transmissionMs".to_string(), json!(120));

        let event = LogEvent::new(
            1_000,
            50,
            10,
            EventType::ImportStarted,
            "Import handed to target",
            details,
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["eventType"], "import_started");
        assert_eq!(value["timestampMs"], 1_000);
        assert_eq!(value["elapsedMs"], 50);
        assert_eq!(value["deltaMs"], 10);
        assert_eq!(value["transmissionMs"], 120);
        assert_eq!(value["timestamp"], "1970-01-01T00:00:01.000Z");
    }

    #[test]
    fn event_round_trips() {
        let mut details = serde_json::Map::new();
        details.insert("error".to_string(), json!("incompatible version"));
        let event = LogEvent::new(
            2_000,
            0,
            0,
            EventType::ImportFailed,
            "Target refused import",
            details,
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: LogEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
