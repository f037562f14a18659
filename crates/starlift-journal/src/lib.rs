//! # starlift-journal — Transaction Logger
//!
//! The authoritative history of every transfer attempt:
//!
//! - **Events** (`event.rs`): structured, strictly ordered log records per
//!   transfer, with elapsed-since-start and delta-since-previous timing.
//!
//! - **Summaries** (`summary.rs`): the minimal list-view record and the
//!   detailed record with derived result, total duration, and embedded
//!   metric blocks.
//!
//! - **Journal** (`journal.rs`): the in-memory event streams plus the
//!   bounded persisted window (`transaction_logs.json`, newest 10
//!   records, upserted by transfer id, atomically rewritten).
//!
//! Live subscribers get each event as it is appended; the persisted window
//! is what survives a coordinator restart. Persistence failures are logged
//! and swallowed — the in-memory journal stays authoritative for the
//! process lifetime.

pub mod event;
pub mod journal;
pub mod summary;

pub use event::{EventType, LogEvent};
pub use journal::{JournalConfig, PersistedLog, TransactionJournal, MAX_PERSISTED_LOGS};
pub use summary::{detailed_transfer_summary, transfer_summary};
