//! # Client Socket Frames
//!
//! UI/control clients speak a much smaller protocol than instances: they
//! send subscription management commands and receive update frames. Update
//! frames are coalesced per channel on the way out, so a client always
//! sees the latest state of a channel, not necessarily every intermediate
//! step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Commands a client sends to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Replace the client's channel subscriptions.
    ///
    /// Channel specs: `tree:{force}`, `transfer:{transferId}`,
    /// `log:{transferId}`, or the wildcards `transfer:*` / `log:*`.
    SetSubscriptions {
        /// The full desired subscription set.
        channels: Vec<String>,
    },
}

/// The kind of update carried by an [`UpdateFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// A fresh instance/platform tree snapshot.
    TreeUpdate,
    /// The latest state of one transfer record.
    TransferUpdate,
    /// A transaction-log event for one transfer.
    LogUpdate,
}

/// One update pushed to a subscribed client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFrame {
    /// The channel this update belongs to (e.g. `tree:player`).
    pub channel: String,
    /// What kind of payload `data` carries.
    #[serde(rename = "updateType")]
    pub kind: UpdateKind,
    /// The update payload.
    pub data: Value,
}
