//! # starlift-proto — Wire Protocol
//!
//! JSON frame formats for the two coordinator sockets:
//!
//! - **Instance socket** (`frame.rs`, `messages.rs`): instances connect,
//!   announce themselves with a hello, then speak a request/response/event
//!   protocol. Requests carry a sequence number for correlation; events
//!   are unsolicited; notifications are fire-and-forget requests with no
//!   response.
//!
//! - **Client socket** (`client.rs`): UI/control clients manage channel
//!   subscriptions and receive coalesced update frames.
//!
//! ## Schema Posture
//!
//! Request payloads are strict (`deny_unknown_fields`) — a malformed
//! request is a caller bug and should fail loudly. Response payloads are
//! forward-compatible: unknown fields are tolerated and opaque `extra`
//! maps are carried through, so a newer instance can ship fields an older
//! coordinator does not know about without breaking the RPC.

pub mod client;
pub mod frame;
pub mod messages;

pub use client::{ClientCommand, UpdateFrame, UpdateKind};
pub use frame::{EventFrame, Frame, NotificationFrame, ProtoError, RequestFrame, ResponseFrame};
pub use messages::{
    BasicResponse, DeleteSourcePlatformRequest, EventMessage, ExportPlatformRequest,
    ExportPlatformResponse, ImportPlatformRequest, InstanceHello, InstanceListPlatformsRequest,
    NotificationMessage, PlatformExportEvent, PlatformInfo, RequestMessage, TransferStatusUpdate,
    TransferValidationEvent, UnlockSourcePlatformRequest,
};
