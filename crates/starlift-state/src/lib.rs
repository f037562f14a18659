//! # starlift-state — Transfer Lifecycle State Machine
//!
//! The platform-transfer saga in type form:
//!
//! - **Status** (`status.rs`): the eight transfer states, the legal
//!   transition table, terminal-state enforcement, and the derived
//!   display result (`SUCCESS` / `FAILED` / `IN_PROGRESS`).
//!
//! - **Phase** (`phase.rs`): the three timed sub-intervals of a transfer
//!   (`transmission`, `validation`, `cleanup`) with open/close bookkeeping.
//!
//! - **Transfer** (`transfer.rs`): the serializable transfer record that
//!   the orchestrator drives through the machine.
//!
//! A transfer that enters a terminal state never leaves it; every attempted
//! transition is validated against the table and illegal moves surface as
//! [`StateError`] rather than silently corrupting the record.

pub mod phase;
pub mod status;
pub mod transfer;

pub use phase::{PhaseTiming, PhaseTimings, TransferPhase};
pub use status::{StateError, TransferResult, TransferStatus};
pub use transfer::Transfer;
