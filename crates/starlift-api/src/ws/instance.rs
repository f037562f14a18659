//! # Instance Socket
//!
//! Game-server instances dial in here. The first frame must be a hello
//! carrying the instance's id, display name, and (when auth is enabled)
//! the shared token. After the handshake the coordinator drives RPCs over
//! the socket and the instance pushes responses and events back.
//!
//! A socket close marks the instance disconnected and fails its
//! outstanding RPCs; the roster entry stays so the instance remains
//! visible (and resolvable) in tree snapshots.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use starlift_gateway::SessionHandle;
use starlift_proto::{EventFrame, EventMessage, Frame, InstanceHello};

use crate::state::AppState;

/// GET /ws/instance — upgrade an instance connection.
pub async fn instance_socket(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_instance_socket(state, socket))
}

async fn run_instance_socket(state: AppState, mut socket: WebSocket) {
    let Some(hello) = await_hello(&mut socket).await else {
        return;
    };
    let auth = crate::auth::AuthConfig {
        token: state.config.auth_token.clone(),
    };
    if !auth.accepts(hello.token.as_deref()) {
        tracing::warn!(instance = %hello.instance_id, "instance hello rejected: bad token");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let instance_id = hello.instance_id;
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();
    let handle = state
        .gateway
        .attach(instance_id, hello.instance_name.clone(), outbound_tx);
    state
        .directory
        .mark_connected(instance_id, hello.instance_name.clone());
    tracing::info!(
        instance = %instance_id,
        name = hello.instance_name,
        "instance connected"
    );
    queue_tree_refresh(&state);

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            match frame.encode() {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "dropping unencodable outbound frame");
                }
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match Frame::decode(&text) {
                Ok(frame) => handle_instance_frame(&state, &handle, frame),
                Err(err) => {
                    tracing::warn!(instance = %instance_id, %err, "malformed instance frame");
                }
            },
            Message::Close(_) => break,
            // Pings are answered at the protocol layer; binary frames are
            // not part of this protocol.
            _ => {}
        }
    }

    writer.abort();
    state.gateway.detach(instance_id);
    state.directory.mark_disconnected(instance_id);
    tracing::info!(instance = %instance_id, "instance disconnected");
    queue_tree_refresh(&state);
}

async fn await_hello(socket: &mut WebSocket) -> Option<InstanceHello> {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(text) => match Frame::decode(&text) {
                Ok(Frame::Hello(hello)) => return Some(hello),
                Ok(_) => {
                    tracing::warn!("instance sent a frame before hello; closing");
                    return None;
                }
                Err(err) => {
                    tracing::warn!(%err, "malformed handshake frame; closing");
                    return None;
                }
            },
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

/// Dispatch one decoded frame from an instance.
pub(crate) fn handle_instance_frame(state: &AppState, handle: &SessionHandle, frame: Frame) {
    match frame {
        Frame::Response(response) => {
            handle.complete(response.seq, response.data);
        }
        Frame::Event(EventFrame { event }) => match event {
            EventMessage::PlatformExport(event) => {
                state.orchestrator.handle_platform_export(event);
            }
            EventMessage::TransferValidation(event) => {
                // Validation handling issues its own RPCs; run it off the
                // socket read loop so a slow cleanup never blocks reads.
                let orchestrator = state.orchestrator.clone();
                tokio::spawn(async move {
                    orchestrator.handle_transfer_validation(event).await;
                });
            }
        },
        Frame::Hello(hello) => {
            tracing::warn!(instance = %hello.instance_id, "duplicate hello ignored");
        }
        Frame::Request(_) | Frame::Notification(_) => {
            tracing::warn!(
                instance = %handle.instance_id(),
                "instances do not issue requests; frame ignored"
            );
        }
    }
}

fn queue_tree_refresh(state: &AppState) {
    let tree = state.tree.clone();
    state.fanout.queue_tree_broadcast("player", move || async move {
        serde_json::to_value(tree.build_tree("player").await).unwrap_or(serde_json::Value::Null)
    });
}
