//! # Client Socket
//!
//! UI/control clients connect here to follow the cluster live. Browsers
//! cannot set headers on WebSocket upgrades, so the token rides in the
//! `token` query parameter and is checked before the upgrade completes.
//!
//! The writer side drains the client's coalesced frame queue: a client
//! that stops reading only loses intermediate states of busy channels,
//! never the latest, and never slows anyone else down.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use starlift_core::ClientId;
use starlift_fanout::SubscriptionPattern;
use starlift_proto::ClientCommand;

use crate::state::AppState;

/// Query parameters accepted on the client upgrade.
#[derive(Debug, Deserialize, Default)]
pub struct ClientSocketParams {
    /// Shared-secret token (required when auth is enabled).
    pub token: Option<String>,
}

/// GET /ws/client — upgrade a subscriber connection.
pub async fn client_socket(
    State(state): State<AppState>,
    Query(params): Query<ClientSocketParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let auth = crate::auth::AuthConfig {
        token: state.config.auth_token.clone(),
    };
    if !auth.accepts(params.token.as_deref()) {
        tracing::warn!("client socket rejected: bad token");
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| run_client_socket(state, socket))
}

async fn run_client_socket(state: AppState, socket: WebSocket) {
    let client_id = ClientId::new();
    let session = state.fanout.register(client_id);
    tracing::info!(client = %client_id, "client connected");

    let (mut sink, mut stream) = socket.split();
    let writer_session = session.clone();
    let writer = tokio::spawn(async move {
        loop {
            let frame = writer_session.next_frame().await;
            let Ok(text) = serde_json::to_string(&frame) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(command) => handle_client_command(&state, client_id, command),
                Err(err) => {
                    tracing::warn!(client = %client_id, %err, "malformed client command");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    writer.abort();
    state.fanout.unregister(client_id);
    tracing::info!(client = %client_id, "client disconnected");
}

/// Apply one client command.
pub(crate) fn handle_client_command(state: &AppState, client_id: ClientId, command: ClientCommand) {
    match command {
        ClientCommand::SetSubscriptions { channels } => {
            let rejected = state.fanout.set_subscriptions(client_id, &channels);
            if !rejected.is_empty() {
                tracing::warn!(
                    client = %client_id,
                    ?rejected,
                    "some channel specs were rejected"
                );
            }

            // Tree subscribers get a snapshot straight away instead of
            // waiting for the next cluster change.
            for spec in &channels {
                if let Ok(SubscriptionPattern::Tree { force }) =
                    spec.parse::<SubscriptionPattern>()
                {
                    let tree = state.tree.clone();
                    let force_owned = force.clone();
                    state.fanout.queue_tree_broadcast(&force, move || async move {
                        serde_json::to_value(tree.build_tree(&force_owned).await)
                            .unwrap_or(serde_json::Value::Null)
                    });
                }
            }
        }
    }
}
