//! # starlift-core — Foundational Types
//!
//! Shared vocabulary for the Starlift coordinator:
//!
//! - **Identity** (`identity.rs`): newtypes for instance, export, transfer,
//!   and client identifiers, plus [`InstanceRef`] for id-or-name lookups.
//!
//! - **Temporal** (`temporal.rs`): millisecond epoch timestamps, ISO 8601
//!   rendering, and human-readable duration formatting.
//!
//! - **Digest** (`digest.rs`): SHA-256 integrity digests over opaque export
//!   payloads.
//!
//! ## Crate Policy
//!
//! No dependencies on other Starlift crates. Everything here is pure data —
//! no I/O, no async.

pub mod digest;
pub mod identity;
pub mod temporal;

pub use digest::payload_digest;
pub use identity::{ClientId, ExportId, IdentityError, InstanceId, InstanceRef, TransferId};
pub use temporal::{format_duration_ms, iso_from_ms, now_ms};
