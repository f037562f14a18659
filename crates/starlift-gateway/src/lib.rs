// SPDX-License-Identifier: BUSL-1.1
//! # starlift-gateway — Instance Transport
//!
//! The coordinator's view of connected instances. Each connected instance
//! has one [`Session`] holding an outbound frame channel and a pending-RPC
//! table; the socket layer owns the actual WebSocket and feeds responses
//! back through a [`SessionHandle`].
//!
//! RPCs are correlated by a per-session sequence number. Every RPC carries
//! a timeout; an instance that stops answering fails the RPC, it never
//! wedges the orchestrator. Detaching a session fails all of its
//! outstanding RPCs immediately.
//!
//! The gateway is purely transport: it does not know what the messages
//! mean and holds no instance metadata beyond the display name.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use starlift_core::InstanceId;
use starlift_proto::{Frame, NotificationFrame, NotificationMessage, RequestFrame, RequestMessage};

/// Default per-RPC timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from instance RPC.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No live session for the instance.
    #[error("instance {0} is not connected")]
    NotConnected(InstanceId),
    /// The instance did not answer within the RPC timeout.
    #[error("instance {instance} did not respond within {waited_ms}ms")]
    Timeout {
        /// The unresponsive instance.
        instance: InstanceId,
        /// How long the coordinator waited.
        waited_ms: u64,
    },
    /// The session went away while the RPC was in flight.
    #[error("instance {0} disconnected mid-request")]
    Disconnected(InstanceId),
    /// The response payload did not match the expected shape.
    #[error("malformed response from instance {instance}: {source}")]
    Decode {
        /// The responding instance.
        instance: InstanceId,
        /// The decode failure.
        #[source]
        source: serde_json::Error,
    },
}

type PendingMap = Arc<DashMap<u64, oneshot::Sender<Value>>>;

struct Session {
    name: String,
    outbound: mpsc::UnboundedSender<Frame>,
    pending: PendingMap,
    next_seq: Arc<AtomicU64>,
}

/// Handle the socket layer uses to feed a session's inbound responses back
/// into the gateway and to tear the session down.
#[derive(Clone)]
pub struct SessionHandle {
    instance_id: InstanceId,
    pending: PendingMap,
}

impl SessionHandle {
    /// Complete the pending RPC with sequence number `seq`.
    ///
    /// Returns `false` for unknown or already-completed sequence numbers
    /// (a late response after timeout is normal, not an error).
    pub fn complete(&self, seq: u64, data: Value) -> bool {
        match self.pending.remove(&seq) {
            Some((_, tx)) => tx.send(data).is_ok(),
            None => {
                tracing::debug!(
                    instance = %self.instance_id,
                    seq,
                    "dropping response for unknown or timed-out request"
                );
                false
            }
        }
    }

    /// The instance this handle belongs to.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }
}

/// Registry of live instance sessions.
pub struct Gateway {
    sessions: DashMap<InstanceId, Session>,
    rpc_timeout: Duration,
}

impl Gateway {
    /// Create a gateway with the default RPC timeout.
    pub fn new() -> Self {
        Self::with_rpc_timeout(DEFAULT_RPC_TIMEOUT)
    }

    /// Create a gateway with a custom default RPC timeout.
    pub fn with_rpc_timeout(rpc_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            rpc_timeout,
        }
    }

    /// Register a live session for `instance_id`.
    ///
    /// `outbound` is drained by the socket task and encoded onto the wire.
    /// A reconnect replaces the previous session; the stale session's
    /// outstanding RPCs fail as disconnected.
    pub fn attach(
        &self,
        instance_id: InstanceId,
        name: impl Into<String>,
        outbound: mpsc::UnboundedSender<Frame>,
    ) -> SessionHandle {
        let pending: PendingMap = Arc::new(DashMap::new());
        let session = Session {
            name: name.into(),
            outbound,
            pending: pending.clone(),
            next_seq: Arc::new(AtomicU64::new(1)),
        };
        if self.sessions.insert(instance_id, session).is_some() {
            tracing::info!(instance = %instance_id, "replacing existing instance session");
        }
        SessionHandle {
            instance_id,
            pending,
        }
    }

    /// Remove the session for `instance_id`, failing its outstanding RPCs.
    pub fn detach(&self, instance_id: InstanceId) {
        if let Some((_, session)) = self.sessions.remove(&instance_id) {
            // Dropping the pending senders wakes every waiter with a
            // disconnect error.
            session.pending.clear();
            tracing::info!(instance = %instance_id, "instance session detached");
        }
    }

    /// Whether a live session exists for `instance_id`.
    pub fn is_connected(&self, instance_id: InstanceId) -> bool {
        self.sessions.contains_key(&instance_id)
    }

    /// Snapshot of connected instances as `(id, name)` pairs.
    pub fn connected_instances(&self) -> Vec<(InstanceId, String)> {
        self.sessions
            .iter()
            .map(|entry| (*entry.key(), entry.value().name.clone()))
            .collect()
    }

    /// Issue an RPC with the gateway's default timeout.
    pub async fn request(
        &self,
        instance_id: InstanceId,
        message: RequestMessage,
    ) -> Result<Value, GatewayError> {
        self.request_with_timeout(instance_id, message, self.rpc_timeout)
            .await
    }

    /// Issue an RPC with an explicit timeout.
    pub async fn request_with_timeout(
        &self,
        instance_id: InstanceId,
        message: RequestMessage,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        // Clone what the await needs, then release the map entry — holding
        // a session reference across the await would block detach.
        let (outbound, pending, next_seq) = {
            let session = self
                .sessions
                .get(&instance_id)
                .ok_or(GatewayError::NotConnected(instance_id))?;
            (
                session.outbound.clone(),
                session.pending.clone(),
                session.next_seq.clone(),
            )
        };

        let seq = next_seq.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        pending.insert(seq, tx);

        let frame = Frame::Request(RequestFrame { seq, message });
        if outbound.send(frame).is_err() {
            pending.remove(&seq);
            return Err(GatewayError::Disconnected(instance_id));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(GatewayError::Disconnected(instance_id)),
            Err(_) => {
                pending.remove(&seq);
                Err(GatewayError::Timeout {
                    instance: instance_id,
                    waited_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Issue an RPC and decode the response against a tolerant schema.
    pub async fn request_typed<T: DeserializeOwned>(
        &self,
        instance_id: InstanceId,
        message: RequestMessage,
    ) -> Result<T, GatewayError> {
        let value = self.request(instance_id, message).await?;
        serde_json::from_value(value).map_err(|source| GatewayError::Decode {
            instance: instance_id,
            source,
        })
    }

    /// Issue an RPC with an explicit timeout and decode the response.
    pub async fn request_typed_with_timeout<T: DeserializeOwned>(
        &self,
        instance_id: InstanceId,
        message: RequestMessage,
        timeout: Duration,
    ) -> Result<T, GatewayError> {
        let value = self
            .request_with_timeout(instance_id, message, timeout)
            .await?;
        serde_json::from_value(value).map_err(|source| GatewayError::Decode {
            instance: instance_id,
            source,
        })
    }

    /// Push a fire-and-forget notification. Failure means the instance is
    /// not connected; callers treat delivery as best-effort.
    pub fn notify(
        &self,
        instance_id: InstanceId,
        message: NotificationMessage,
    ) -> Result<(), GatewayError> {
        let session = self
            .sessions
            .get(&instance_id)
            .ok_or(GatewayError::NotConnected(instance_id))?;
        session
            .outbound
            .send(Frame::Notification(NotificationFrame { message }))
            .map_err(|_| GatewayError::Disconnected(instance_id))
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("sessions", &self.sessions.len())
            .field("rpc_timeout", &self.rpc_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use starlift_proto::{BasicResponse, ExportPlatformRequest, TransferStatusUpdate};

    fn export_request() -> RequestMessage {
        RequestMessage::ExportPlatform(ExportPlatformRequest {
            platform_index: 1,
            force_name: "player".to_string(),
        })
    }

    /// Attach a scripted instance that answers every request with `reply`.
    fn scripted_instance(gateway: &Gateway, id: InstanceId, reply: Value) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = gateway.attach(id, format!("inst-{id}"), tx);
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Frame::Request(req) = frame {
                    handle.complete(req.seq, reply.clone());
                }
            }
        });
    }

    #[tokio::test]
    async fn request_round_trips_through_session() {
        let gateway = Gateway::new();
        let id = InstanceId::new(1);
        scripted_instance(&gateway, id, json!({"success": true}));

        let response: BasicResponse = gateway.request_typed(id, export_request()).await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn request_to_unknown_instance_fails_fast() {
        let gateway = Gateway::new();
        let err = gateway
            .request(InstanceId::new(9), export_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotConnected(id) if id.value() == 9));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_request_times_out() {
        let gateway = Gateway::with_rpc_timeout(Duration::from_millis(250));
        let id = InstanceId::new(2);
        // Attach but never answer.
        let (tx, _rx) = mpsc::unbounded_channel();
        gateway.attach(id, "silent", tx);

        let err = gateway.request(id, export_request()).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Timeout { waited_ms: 250, .. }
        ));
    }

    #[tokio::test]
    async fn detach_fails_outstanding_requests() {
        let gateway = Arc::new(Gateway::new());
        let id = InstanceId::new(3);
        let (tx, mut rx) = mpsc::unbounded_channel();
        gateway.attach(id, "flaky", tx);

        let gw = gateway.clone();
        let rpc = tokio::spawn(async move { gw.request(id, export_request()).await });

        // Wait until the request frame is actually in flight, then detach.
        let _ = rx.recv().await;
        gateway.detach(id);

        let err = rpc.await.unwrap().unwrap_err();
        assert!(matches!(err, GatewayError::Disconnected(_)));
    }

    #[tokio::test]
    async fn late_response_after_timeout_is_dropped() {
        let gateway = Gateway::with_rpc_timeout(Duration::from_millis(10));
        let id = InstanceId::new(4);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = gateway.attach(id, "slow", tx);

        let err = gateway.request(id, export_request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { .. }));

        // The response arrives after the deadline; completion reports it
        // as unknown rather than panicking or mis-delivering.
        let frame = rx.recv().await.unwrap();
        if let Frame::Request(req) = frame {
            assert!(!handle.complete(req.seq, json!({"success": true})));
        }
    }

    #[tokio::test]
    async fn reconnect_replaces_session() {
        let gateway = Gateway::new();
        let id = InstanceId::new(5);
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        gateway.attach(id, "old", old_tx);

        scripted_instance(&gateway, id, json!({"success": true}));
        let response: BasicResponse = gateway.request_typed(id, export_request()).await.unwrap();
        assert!(response.success);
        assert_eq!(gateway.connected_instances().len(), 1);
    }

    #[tokio::test]
    async fn notify_is_fire_and_forget() {
        let gateway = Gateway::new();
        let id = InstanceId::new(6);
        let (tx, mut rx) = mpsc::unbounded_channel();
        gateway.attach(id, "target", tx);

        gateway
            .notify(
                id,
                NotificationMessage::TransferStatus(TransferStatusUpdate {
                    transfer_id: "transfer_1_aa".to_string(),
                    platform_name: "Aurora".to_string(),
                    message: "Transfer complete".to_string(),
                    color: "green".to_string(),
                }),
            )
            .unwrap();

        match rx.recv().await.unwrap() {
            Frame::Notification(frame) => {
                let NotificationMessage::TransferStatus(update) = frame.message;
                assert_eq!(update.color, "green");
            }
            other => panic!("expected notification, got {other:?}"),
        }

        // Unknown instance → NotConnected, which callers ignore.
        let err = gateway
            .notify(
                InstanceId::new(99),
                NotificationMessage::TransferStatus(TransferStatusUpdate {
                    transfer_id: "t".to_string(),
                    platform_name: "p".to_string(),
                    message: "m".to_string(),
                    color: "red".to_string(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotConnected(_)));
    }

    #[tokio::test]
    async fn decode_error_surfaces_as_decode() {
        let gateway = Gateway::new();
        let id = InstanceId::new(7);
        scripted_instance(&gateway, id, json!("not an object"));

        let err = gateway
            .request_typed::<BasicResponse>(id, export_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }
}
