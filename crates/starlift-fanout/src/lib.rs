//! # starlift-fanout — Subscription & Broadcast Fabric
//!
//! Pushes tree, transfer, and log updates to subscribed clients without
//! ever letting a slow client stall the coordinator:
//!
//! - Delivery is **non-blocking**: updates land in a per-client pending
//!   queue drained by that client's socket writer.
//! - Pending frames **coalesce per channel**: a newer update for a channel
//!   replaces the older pending one in place, so a lagging client always
//!   sees the latest state of each channel. The transaction log remains
//!   the complete history; the live channel is advisory.
//! - Tree broadcasts are **rate-limited per force**: at most one per
//!   window, trailing-edge, and the snapshot is computed at send time so
//!   the delivered tree is the freshest available.

pub mod channel;
pub mod session;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use starlift_core::{ClientId, TransferId};
use starlift_proto::{UpdateFrame, UpdateKind};

pub use channel::{ChannelError, SubscriptionPattern};
pub use session::ClientSession;

/// Default per-force tree broadcast window.
pub const DEFAULT_TREE_BROADCAST_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Default)]
struct TreeGate {
    last_sent: Option<Instant>,
    pending: bool,
}

/// Client subscription registry and update fan-out.
pub struct SubscriptionManager {
    clients: DashMap<ClientId, Arc<ClientSession>>,
    tree_gates: Mutex<HashMap<String, TreeGate>>,
    window: Duration,
    me: Weak<Self>,
}

impl SubscriptionManager {
    /// Manager with the default tree broadcast window.
    pub fn new() -> Arc<Self> {
        Self::with_window(DEFAULT_TREE_BROADCAST_WINDOW)
    }

    /// Manager with a custom tree broadcast window.
    pub fn with_window(window: Duration) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            clients: DashMap::new(),
            tree_gates: Mutex::new(HashMap::new()),
            window,
            me: me.clone(),
        })
    }

    /// Register a client session. The returned session is shared with the
    /// client's socket writer, which drains frames via
    /// [`ClientSession::next_frame`].
    pub fn register(&self, client_id: ClientId) -> Arc<ClientSession> {
        let session = Arc::new(ClientSession::new(client_id));
        self.clients.insert(client_id, session.clone());
        session
    }

    /// Drop a client and its subscriptions (socket closed).
    pub fn unregister(&self, client_id: ClientId) {
        self.clients.remove(&client_id);
    }

    /// Replace a client's subscription set from raw channel specs.
    ///
    /// Returns the specs that failed to parse; valid specs take effect
    /// regardless.
    pub fn set_subscriptions(&self, client_id: ClientId, channels: &[String]) -> Vec<String> {
        let mut patterns = Vec::new();
        let mut rejected = Vec::new();
        for spec in channels {
            match spec.parse::<SubscriptionPattern>() {
                Ok(pattern) => patterns.push(pattern),
                Err(err) => {
                    tracing::debug!(client = %client_id, spec, %err, "rejecting channel spec");
                    rejected.push(spec.clone());
                }
            }
        }
        if let Some(session) = self.clients.get(&client_id) {
            session.replace_subscriptions(patterns);
        }
        rejected
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Push the latest state of a transfer to its channel subscribers.
    pub fn emit_transfer_update(&self, transfer_id: &TransferId, payload: Value) {
        let frame = UpdateFrame {
            channel: format!("transfer:{transfer_id}"),
            kind: UpdateKind::TransferUpdate,
            data: payload,
        };
        self.deliver(&frame, |p| p.matches_transfer(transfer_id));
    }

    /// Push a transaction-log event to its channel subscribers.
    pub fn emit_log_update(&self, transfer_id: &TransferId, event: Value) {
        let frame = UpdateFrame {
            channel: format!("log:{transfer_id}"),
            kind: UpdateKind::LogUpdate,
            data: event,
        };
        self.deliver(&frame, |p| p.matches_log(transfer_id));
    }

    /// Push a tree snapshot to subscribers of that force, bypassing the
    /// rate limit (used for the initial snapshot on subscribe).
    pub fn emit_tree_update(&self, force: &str, snapshot: Value) {
        let frame = UpdateFrame {
            channel: format!("tree:{force}"),
            kind: UpdateKind::TreeUpdate,
            data: snapshot,
        };
        self.deliver(&frame, |p| p.matches_tree(force));
    }

    /// Queue a rate-limited tree broadcast for `force`.
    ///
    /// If a broadcast for this force is already pending, the call is
    /// dropped — the pending one will deliver the latest snapshot, since
    /// `build` runs at send time. Otherwise the broadcast fires once the
    /// rate-limit window since the previous send has elapsed.
    pub fn queue_tree_broadcast<F, Fut>(&self, force: &str, build: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Value> + Send,
    {
        let Some(manager) = self.me.upgrade() else {
            return;
        };
        let delay = {
            let mut gates = self.tree_gates.lock();
            let gate = gates.entry(force.to_string()).or_default();
            if gate.pending {
                return;
            }
            gate.pending = true;
            match gate.last_sent {
                Some(last) => self.window.saturating_sub(last.elapsed()),
                None => Duration::ZERO,
            }
        };

        let force = force.to_string();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let snapshot = build().await;
            {
                let mut gates = manager.tree_gates.lock();
                if let Some(gate) = gates.get_mut(&force) {
                    gate.pending = false;
                    gate.last_sent = Some(Instant::now());
                }
            }
            manager.emit_tree_update(&force, snapshot);
        });
    }

    /// Deliver a frame to every client whose subscriptions match.
    fn deliver(&self, frame: &UpdateFrame, matches: impl Fn(&SubscriptionPattern) -> bool) {
        for entry in self.clients.iter() {
            let session = entry.value();
            if session.is_subscribed(&matches) {
                session.offer(frame.clone());
            }
        }
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("clients", &self.clients.len())
            .field("window", &self.window)
            .finish()
    }
}
