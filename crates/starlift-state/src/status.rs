//! # Transfer Status
//!
//! The transfer saga:
//!
//! ```text
//! creating → transporting → awaiting_validation → cleanup → completed
//!                │                  │                 │
//!                ▼                  ▼                 ▼
//!              failed             failed        cleanup_failed
//! ```
//!
//! plus `error` reachable from any non-terminal state (uncaught failure in
//! a coordination step). Terminal states: `completed`, `failed`,
//! `cleanup_failed`, `error` — once entered, a transfer never leaves them.
//!
//! Older deployments wrote the raw status `importing` where this codebase
//! writes `transporting`; reads accept the legacy name, writes only ever
//! produce the canonical one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from illegal state-machine operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StateError {
    /// Attempted to move a transfer out of a terminal state.
    #[error("transfer {id} is in terminal state {state}")]
    AlreadyTerminal {
        /// Transfer identifier.
        id: String,
        /// The terminal state the transfer is in.
        state: TransferStatus,
    },

    /// The requested transition is not in the legal table.
    #[error("invalid transfer transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: TransferStatus,
        /// Attempted target state.
        to: TransferStatus,
    },
}

/// The state of a transfer saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Record allocated, not yet broadcast. Transient.
    Creating,
    /// Export is being transmitted to the target.
    ///
    /// The `importing` alias is the legacy wire name for this state;
    /// accepted on read, never written.
    #[serde(alias = "importing")]
    Transporting,
    /// Target accepted the import; waiting on the validation callback.
    AwaitingValidation,
    /// Validation succeeded; source-deletion RPC in flight.
    Cleanup,
    /// Terminal success: source deleted, export purged, log persisted.
    Completed,
    /// Terminal failure: import refused, validation failed, or validation
    /// timed out. Rollback was attempted.
    Failed,
    /// Terminal partial failure: validation succeeded but source deletion
    /// failed. Target holds the authoritative copy; manual resolution.
    CleanupFailed,
    /// Terminal internal error on a coordination step.
    Error,
}

impl TransferStatus {
    /// Whether this state is terminal (no further transitions).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::CleanupFailed | Self::Error
        )
    }

    /// The canonical wire/persisted name of this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Transporting => "transporting",
            Self::AwaitingValidation => "awaiting_validation",
            Self::Cleanup => "cleanup",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::CleanupFailed => "cleanup_failed",
            Self::Error => "error",
        }
    }

    /// Legal successor states.
    pub fn valid_transitions(self) -> &'static [TransferStatus] {
        match self {
            Self::Creating => &[Self::Transporting, Self::Error],
            Self::Transporting => &[Self::AwaitingValidation, Self::Failed, Self::Error],
            Self::AwaitingValidation => &[Self::Cleanup, Self::Failed, Self::Error],
            Self::Cleanup => &[Self::Completed, Self::CleanupFailed, Self::Error],
            Self::Completed | Self::Failed | Self::CleanupFailed | Self::Error => &[],
        }
    }

    /// Whether moving to `to` is legal from this state.
    pub fn can_transition_to(self, to: TransferStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The derived operator-facing outcome of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferResult {
    /// Transfer reached `completed`.
    Success,
    /// Transfer reached `failed`, `cleanup_failed`, or `error`.
    Failed,
    /// Transfer has not reached a terminal state.
    InProgress,
}

impl TransferResult {
    /// The string form used in persisted summaries.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::InProgress => "IN_PROGRESS",
        }
    }
}

impl From<TransferStatus> for TransferResult {
    fn from(status: TransferStatus) -> Self {
        match status {
            TransferStatus::Completed => Self::Success,
            TransferStatus::Failed | TransferStatus::CleanupFailed | TransferStatus::Error => {
                Self::Failed
            }
            _ => Self::InProgress,
        }
    }
}

impl std::fmt::Display for TransferResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_terminal() {
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
        assert!(TransferStatus::CleanupFailed.is_terminal());
        assert!(TransferStatus::Error.is_terminal());
        assert!(!TransferStatus::Creating.is_terminal());
        assert!(!TransferStatus::Transporting.is_terminal());
        assert!(!TransferStatus::AwaitingValidation.is_terminal());
        assert!(!TransferStatus::Cleanup.is_terminal());
    }

    #[test]
    fn terminal_states_have_no_successors() {
        for status in [
            TransferStatus::Completed,
            TransferStatus::Failed,
            TransferStatus::CleanupFailed,
            TransferStatus::Error,
        ] {
            assert!(status.valid_transitions().is_empty(), "{status}");
        }
    }

    #[test]
    fn happy_path_is_legal() {
        assert!(TransferStatus::Creating.can_transition_to(TransferStatus::Transporting));
        assert!(TransferStatus::Transporting.can_transition_to(TransferStatus::AwaitingValidation));
        assert!(TransferStatus::AwaitingValidation.can_transition_to(TransferStatus::Cleanup));
        assert!(TransferStatus::Cleanup.can_transition_to(TransferStatus::Completed));
    }

    #[test]
    fn failure_edges_are_legal() {
        assert!(TransferStatus::Transporting.can_transition_to(TransferStatus::Failed));
        assert!(TransferStatus::AwaitingValidation.can_transition_to(TransferStatus::Failed));
        assert!(TransferStatus::Cleanup.can_transition_to(TransferStatus::CleanupFailed));
    }

    #[test]
    fn error_is_reachable_from_every_non_terminal_state() {
        for status in [
            TransferStatus::Creating,
            TransferStatus::Transporting,
            TransferStatus::AwaitingValidation,
            TransferStatus::Cleanup,
        ] {
            assert!(status.can_transition_to(TransferStatus::Error), "{status}");
        }
    }

    #[test]
    fn skipping_states_is_illegal() {
        assert!(!TransferStatus::Creating.can_transition_to(TransferStatus::Completed));
        assert!(!TransferStatus::Transporting.can_transition_to(TransferStatus::Cleanup));
        assert!(!TransferStatus::AwaitingValidation.can_transition_to(TransferStatus::Completed));
        // Cleanup failures only happen after validation success.
        assert!(!TransferStatus::Transporting.can_transition_to(TransferStatus::CleanupFailed));
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&TransferStatus::AwaitingValidation).unwrap(),
            "\"awaiting_validation\""
        );
        assert_eq!(
            serde_json::to_string(&TransferStatus::CleanupFailed).unwrap(),
            "\"cleanup_failed\""
        );
    }

    #[test]
    fn legacy_importing_reads_as_transporting() {
        let status: TransferStatus = serde_json::from_str("\"importing\"").unwrap();
        assert_eq!(status, TransferStatus::Transporting);
        // And it is re-written canonically.
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            "\"transporting\""
        );
    }

    #[test]
    fn result_derivation_matches_status() {
        assert_eq!(
            TransferResult::from(TransferStatus::Completed),
            TransferResult::Success
        );
        for status in [
            TransferStatus::Failed,
            TransferStatus::CleanupFailed,
            TransferStatus::Error,
        ] {
            assert_eq!(TransferResult::from(status), TransferResult::Failed);
        }
        for status in [
            TransferStatus::Creating,
            TransferStatus::Transporting,
            TransferStatus::AwaitingValidation,
            TransferStatus::Cleanup,
        ] {
            assert_eq!(TransferResult::from(status), TransferResult::InProgress);
        }
    }

    #[test]
    fn result_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&TransferResult::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
    }
}
