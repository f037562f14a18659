//! WebSocket endpoints: the instance socket (RPC + events) and the
//! client socket (subscriptions + coalesced updates).

pub mod client;
pub mod instance;
