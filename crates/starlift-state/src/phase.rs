//! # Transfer Phases
//!
//! A transfer is timed in three named sub-intervals: `transmission` (payload
//! handed to the target), `validation` (waiting on the target's verdict),
//! and `cleanup` (source-side deletion). Each phase records start and end
//! in epoch milliseconds; durations feed the persisted summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named timed sub-interval of a transfer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    /// Export payload in flight to the target instance.
    Transmission,
    /// Awaiting the target's validation verdict.
    Validation,
    /// Source-side deletion after validation success.
    Cleanup,
}

impl TransferPhase {
    /// The phase name used in log-event payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transmission => "transmission",
            Self::Validation => "validation",
            Self::Cleanup => "cleanup",
        }
    }

    /// The flattened summary key for this phase's duration
    /// (e.g. `transmissionMs`).
    pub fn summary_key(self) -> &'static str {
        match self {
            Self::Transmission => "transmissionMs",
            Self::Validation => "validationMs",
            Self::Cleanup => "cleanupMs",
        }
    }
}

impl std::fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded timing of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTiming {
    /// When the phase opened.
    pub start_ms: i64,
    /// When the phase closed. `None` while the phase is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<i64>,
    /// `end_ms - start_ms`, clamped to ≥ 0. `None` while the phase is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

/// Per-transfer phase timing table.
///
/// Phases are opened and closed by the orchestrator at state boundaries.
/// Closing a phase that was never opened is a no-op that reports a zero
/// duration — the caller logs the oddity but must not fail the transfer
/// over bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseTimings(BTreeMap<TransferPhase, PhaseTiming>);

impl PhaseTimings {
    /// Empty timing table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a phase. Re-opening an already-open phase
    /// resets its start (last open wins).
    pub fn open(&mut self, phase: TransferPhase, now_ms: i64) {
        self.0.insert(
            phase,
            PhaseTiming {
                start_ms: now_ms,
                end_ms: None,
                duration_ms: None,
            },
        );
    }

    /// Record the end of a phase and return its duration in milliseconds.
    ///
    /// Returns 0 (and records nothing) if the phase was never opened.
    /// A close timestamp earlier than the open timestamp clamps to 0.
    pub fn close(&mut self, phase: TransferPhase, now_ms: i64) -> i64 {
        match self.0.get_mut(&phase) {
            Some(timing) => {
                let duration = (now_ms - timing.start_ms).max(0);
                timing.end_ms = Some(timing.start_ms + duration);
                timing.duration_ms = Some(duration);
                duration
            }
            None => 0,
        }
    }

    /// The recorded timing for a phase, if any.
    pub fn get(&self, phase: TransferPhase) -> Option<&PhaseTiming> {
        self.0.get(&phase)
    }

    /// The recorded duration for a phase, if the phase has closed.
    pub fn duration_ms(&self, phase: TransferPhase) -> Option<i64> {
        self.0.get(&phase).and_then(|t| t.duration_ms)
    }

    /// Iterate over recorded phases in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (TransferPhase, &PhaseTiming)> {
        self.0.iter().map(|(phase, timing)| (*phase, timing))
    }

    /// Flatten closed phases to `{<phase>Ms: duration}` for summary
    /// records. Open phases (no duration yet) are skipped.
    pub fn summary(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (phase, timing) in self.iter() {
            if let Some(duration) = timing.duration_ms {
                map.insert(phase.summary_key().to_string(), duration.into());
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_then_close_records_duration() {
        let mut phases = PhaseTimings::new();
        phases.open(TransferPhase::Transmission, 1_000);
        let duration = phases.close(TransferPhase::Transmission, 1_350);
        assert_eq!(duration, 350);

        let timing = phases.get(TransferPhase::Transmission).unwrap();
        assert_eq!(timing.start_ms, 1_000);
        assert_eq!(timing.end_ms, Some(1_350));
        assert_eq!(timing.duration_ms, Some(350));
    }

    #[test]
    fn closing_unopened_phase_returns_zero() {
        let mut phases = PhaseTimings::new();
        assert_eq!(phases.close(TransferPhase::Validation, 5_000), 0);
        assert!(phases.get(TransferPhase::Validation).is_none());
    }

    #[test]
    fn close_before_open_clamps_to_zero() {
        let mut phases = PhaseTimings::new();
        phases.open(TransferPhase::Cleanup, 2_000);
        let duration = phases.close(TransferPhase::Cleanup, 1_500);
        assert_eq!(duration, 0);
        // end_ms never precedes start_ms.
        let timing = phases.get(TransferPhase::Cleanup).unwrap();
        assert_eq!(timing.end_ms, Some(2_000));
    }

    #[test]
    fn reopen_resets_start() {
        let mut phases = PhaseTimings::new();
        phases.open(TransferPhase::Validation, 100);
        phases.open(TransferPhase::Validation, 500);
        assert_eq!(phases.close(TransferPhase::Validation, 600), 100);
    }

    #[test]
    fn summary_skips_open_phases() {
        let mut phases = PhaseTimings::new();
        phases.open(TransferPhase::Transmission, 0);
        phases.close(TransferPhase::Transmission, 40);
        phases.open(TransferPhase::Validation, 40);

        let summary = phases.summary();
        assert_eq!(summary.get("transmissionMs"), Some(&40.into()));
        assert!(!summary.contains_key("validationMs"));
        assert!(!summary.contains_key("cleanupMs"));
    }

    #[test]
    fn timings_serialize_with_camel_case_keys() {
        let mut phases = PhaseTimings::new();
        phases.open(TransferPhase::Transmission, 10);
        phases.close(TransferPhase::Transmission, 25);

        let json = serde_json::to_value(&phases).unwrap();
        let timing = &json["transmission"];
        assert_eq!(timing["startMs"], 10);
        assert_eq!(timing["endMs"], 25);
        assert_eq!(timing["durationMs"], 15);
    }

    #[test]
    fn timings_round_trip() {
        let mut phases = PhaseTimings::new();
        phases.open(TransferPhase::Transmission, 10);
        phases.close(TransferPhase::Transmission, 25);
        phases.open(TransferPhase::Validation, 25);

        let json = serde_json::to_string(&phases).unwrap();
        let back: PhaseTimings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, phases);
    }
}
