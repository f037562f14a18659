//! # Metric Passthrough & Conversion
//!
//! Two small, deliberately shallow inspections of otherwise opaque data:
//!
//! - Target instances report import metrics in game ticks; display paths
//!   want milliseconds. Fields named `*Ticks` are converted by the fixed
//!   engine tick length and renamed `*Ms`; everything else (counts,
//!   flags) passes through unchanged.
//!
//! - Export payloads carry a handful of top-level shape fields (entity and
//!   tile counts, unique item/fluid types, totals, compression flag) that
//!   are lifted into `payloadMetrics` for display. The payload itself is
//!   never modified.

use serde_json::{Map, Value};

/// One game tick in milliseconds (60 ticks per second, as reported by the
/// game engine's display conventions).
pub const TICK_MS: f64 = 16.67;

/// Payload fields lifted into `payloadMetrics` when present.
const PAYLOAD_METRIC_KEYS: &[&str] = &[
    "compressed",
    "entityCount",
    "tileCount",
    "uniqueItemTypes",
    "uniqueFluidTypes",
    "totalItemCount",
    "totalFluidCount",
];

/// Convert tick-valued fields of a raw metrics object to milliseconds.
///
/// `{"importTicks": 60, "entityCount": 5}` becomes
/// `{"importMs": 1000.2, "entityCount": 5}`. Non-object values pass
/// through untouched.
pub fn convert_tick_metrics(raw: &Value) -> Value {
    let Some(object) = raw.as_object() else {
        return raw.clone();
    };

    let mut converted = Map::new();
    for (key, value) in object {
        match key.strip_suffix("Ticks") {
            Some(prefix) => {
                let ms = value.as_f64().map(|ticks| ticks * TICK_MS);
                match ms {
                    Some(ms) => {
                        converted.insert(format!("{prefix}Ms"), round_tenth(ms));
                    }
                    // A tick field that is not a number passes through
                    // under its original name rather than being invented.
                    None => {
                        converted.insert(key.clone(), value.clone());
                    }
                }
            }
            None => {
                converted.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(converted)
}

fn round_tenth(ms: f64) -> Value {
    let rounded = (ms * 10.0).round() / 10.0;
    serde_json::Number::from_f64(rounded)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Lift display metrics out of an export payload.
///
/// Always includes `sizeBytes`; payload shape fields are copied only when
/// the payload is an object that carries them.
pub fn extract_payload_metrics(export_data: &Value, size_bytes: u64) -> Value {
    let mut metrics = Map::new();
    metrics.insert("sizeBytes".to_string(), size_bytes.into());

    if let Some(object) = export_data.as_object() {
        for key in PAYLOAD_METRIC_KEYS {
            if let Some(value) = object.get(*key) {
                metrics.insert((*key).to_string(), value.clone());
            }
        }
    }
    Value::Object(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tick_fields_convert_and_rename() {
        let raw = json!({
            "importTicks": 60,
            "rebuildTicks": 1,
            "entityCount": 5,
            "itemsRestored": 1200
        });
        let converted = convert_tick_metrics(&raw);
        assert_eq!(converted["importMs"], 1000.2);
        assert_eq!(converted["rebuildMs"], 16.7);
        // Count fields pass through unchanged.
        assert_eq!(converted["entityCount"], 5);
        assert_eq!(converted["itemsRestored"], 1200);
        assert!(converted.get("importTicks").is_none());
    }

    #[test]
    fn non_numeric_tick_field_passes_through() {
        let raw = json!({"importTicks": "n/a"});
        let converted = convert_tick_metrics(&raw);
        assert_eq!(converted["importTicks"], "n/a");
        assert!(converted.get("importMs").is_none());
    }

    #[test]
    fn non_object_metrics_pass_through() {
        assert_eq!(convert_tick_metrics(&json!(null)), json!(null));
        assert_eq!(convert_tick_metrics(&json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn payload_metrics_lift_known_fields() {
        let payload = json!({
            "compressed": true,
            "entityCount": 812,
            "tileCount": 404,
            "uniqueItemTypes": 31,
            "uniqueFluidTypes": 3,
            "totalItemCount": 90211,
            "totalFluidCount": 25000,
            "entities": ["…"],
        });
        let metrics = extract_payload_metrics(&payload, 4096);
        assert_eq!(metrics["sizeBytes"], 4096);
        assert_eq!(metrics["compressed"], true);
        assert_eq!(metrics["entityCount"], 812);
        assert_eq!(metrics["totalFluidCount"], 25000);
        // The raw entity list is not a display metric.
        assert!(metrics.get("entities").is_none());
    }

    #[test]
    fn payload_metrics_for_opaque_blob_is_size_only() {
        let metrics = extract_payload_metrics(&json!("base64blob…"), 9000);
        assert_eq!(metrics, json!({"sizeBytes": 9000}));
    }
}
