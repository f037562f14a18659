//! # Frame Envelope
//!
//! Every message on the instance socket is one JSON object with a `kind`
//! discriminator:
//!
//! ```json
//! {"kind": "hello", "instanceId": 4, "instanceName": "alpha", "token": "…"}
//! {"kind": "request", "seq": 7, "type": "ExportPlatformRequest", "data": {…}}
//! {"kind": "response", "seq": 7, "data": {"success": true, "exportId": "…"}}
//! {"kind": "event", "type": "PlatformExportEvent", "data": {…}}
//! {"kind": "notification", "type": "TransferStatusUpdate", "data": {…}}
//! ```
//!
//! Responses are raw JSON values here; typed decoding happens at the
//! gateway so response schemas stay forward-compatible.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages::{EventMessage, InstanceHello, NotificationMessage, RequestMessage};

/// Errors encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The frame was not valid JSON or did not match any frame shape.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One message on the instance socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    /// Connection handshake, sent once by the instance after connecting.
    Hello(InstanceHello),
    /// Coordinator-initiated RPC expecting a response with the same `seq`.
    Request(RequestFrame),
    /// Instance reply to a prior request.
    Response(ResponseFrame),
    /// Unsolicited instance-originated event.
    Event(EventFrame),
    /// Fire-and-forget message; no response expected.
    Notification(NotificationFrame),
}

impl Frame {
    /// Decode a frame from its JSON text form.
    pub fn decode(text: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode a frame to its JSON text form.
    pub fn encode(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// An outbound RPC with correlation sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Correlation sequence number, unique per connection.
    pub seq: u64,
    /// The request payload.
    #[serde(flatten)]
    pub message: RequestMessage,
}

/// An instance's reply to a request.
///
/// The payload stays untyped at this layer; the gateway decodes it against
/// the tolerant response schema for the request it correlates with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// The `seq` of the request being answered.
    pub seq: u64,
    /// Raw response payload.
    #[serde(default)]
    pub data: Value,
}

/// An unsolicited event from an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// The event payload.
    #[serde(flatten)]
    pub event: EventMessage,
}

/// A fire-and-forget message with no response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationFrame {
    /// The notification payload.
    #[serde(flatten)]
    pub message: NotificationMessage,
}
