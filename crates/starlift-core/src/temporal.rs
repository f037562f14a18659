//! # Temporal Helpers
//!
//! The coordinator keeps every timestamp as milliseconds since the Unix
//! epoch (UTC). ISO 8601 strings are a presentation concern: log events
//! carry both forms, everything else carries only the integer.

use chrono::{DateTime, Utc};

/// Current UTC time as milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render an epoch-millisecond timestamp as an ISO 8601 UTC string with
/// millisecond precision (e.g. `2026-08-01T12:00:00.123Z`).
///
/// Out-of-range values fall back to the epoch rather than panicking.
pub fn iso_from_ms(ms: i64) -> String {
    let dt = DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp_millis(0).unwrap_or_default());
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Format a duration for operator display: `Xms` under one second,
/// `X.Xs` from one second up.
pub fn format_duration_ms(ms: i64) -> String {
    let ms = ms.max(0);
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_rendering_is_utc_with_millis() {
        assert_eq!(iso_from_ms(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(iso_from_ms(1_500), "1970-01-01T00:00:01.500Z");
    }

    #[test]
    fn sub_second_durations_use_millis() {
        assert_eq!(format_duration_ms(0), "0ms");
        assert_eq!(format_duration_ms(743), "743ms");
        assert_eq!(format_duration_ms(999), "999ms");
    }

    #[test]
    fn second_and_above_durations_use_decimal_seconds() {
        assert_eq!(format_duration_ms(1000), "1.0s");
        assert_eq!(format_duration_ms(12_340), "12.3s");
        assert_eq!(format_duration_ms(120_000), "120.0s");
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        assert_eq!(format_duration_ms(-50), "0ms");
    }

    #[test]
    fn now_ms_is_sane() {
        // Any time after 2020-01-01 and before 2100-01-01.
        let now = now_ms();
        assert!(now > 1_577_836_800_000);
        assert!(now < 4_102_444_800_000);
    }

    proptest::proptest! {
        #[test]
        fn duration_formatting_never_panics(ms in i64::MIN..i64::MAX) {
            let rendered = format_duration_ms(ms);
            proptest::prop_assert!(rendered.ends_with("ms") || rendered.ends_with('s'));
        }

        #[test]
        fn iso_rendering_never_panics(ms in i64::MIN..i64::MAX) {
            let rendered = iso_from_ms(ms);
            proptest::prop_assert!(rendered.ends_with('Z'));
        }

        #[test]
        fn sub_second_renders_ms_and_rest_renders_seconds(ms in 0i64..10_000_000) {
            let rendered = format_duration_ms(ms);
            if ms < 1000 {
                proptest::prop_assert_eq!(rendered, format!("{ms}ms"));
            } else {
                proptest::prop_assert!(rendered.ends_with('s') && !rendered.ends_with("ms"));
            }
        }
    }
}
