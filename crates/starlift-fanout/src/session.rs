//! # Client Sessions
//!
//! One [`ClientSession`] per connected client. Emitters call
//! [`ClientSession::offer`] (never blocks); the client's socket writer
//! drains frames with [`ClientSession::next_frame`].
//!
//! The pending queue coalesces by channel: a newer frame for a channel
//! replaces the older pending one *in place*, preserving the channel's
//! position in the drain order. If the queue is full anyway, the oldest
//! pending frame is dropped — the producer is never the one to wait.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use starlift_core::ClientId;
use starlift_proto::UpdateFrame;

use crate::channel::SubscriptionPattern;

/// Upper bound on distinct pending frames per client.
const MAX_PENDING_FRAMES: usize = 64;

/// A connected client's subscription set and outbound frame queue.
pub struct ClientSession {
    client_id: ClientId,
    subscriptions: Mutex<Vec<SubscriptionPattern>>,
    pending: Mutex<VecDeque<UpdateFrame>>,
    notify: Notify,
}

impl ClientSession {
    pub(crate) fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            subscriptions: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// This session's client id.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Replace the subscription set.
    pub(crate) fn replace_subscriptions(&self, patterns: Vec<SubscriptionPattern>) {
        *self.subscriptions.lock() = patterns;
    }

    /// Whether any subscription satisfies `matches`.
    pub(crate) fn is_subscribed(&self, matches: &impl Fn(&SubscriptionPattern) -> bool) -> bool {
        self.subscriptions.lock().iter().any(matches)
    }

    /// Queue a frame for delivery. Never blocks; coalesces per channel.
    pub(crate) fn offer(&self, frame: UpdateFrame) {
        {
            let mut pending = self.pending.lock();
            if let Some(slot) = pending.iter_mut().find(|f| f.channel == frame.channel) {
                *slot = frame;
            } else {
                if pending.len() >= MAX_PENDING_FRAMES {
                    let dropped = pending.pop_front();
                    if let Some(dropped) = dropped {
                        tracing::debug!(
                            client = %self.client_id,
                            channel = dropped.channel,
                            "client queue full; dropping oldest pending update"
                        );
                    }
                }
                pending.push_back(frame);
            }
        }
        self.notify.notify_one();
    }

    /// Await the next frame to deliver. Cancellation-safe: a frame is only
    /// removed from the queue when it is returned.
    pub async fn next_frame(&self) -> UpdateFrame {
        loop {
            let notified = self.notify.notified();
            if let Some(frame) = self.pending.lock().pop_front() {
                return frame;
            }
            notified.await;
        }
    }

    /// Number of frames currently pending.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("client_id", &self.client_id)
            .field("pending", &self.pending_len())
            .finish()
    }
}
