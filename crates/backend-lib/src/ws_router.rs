// ============================
// crates/backend-lib/src/ws_router.rs
// ============================
//! Realtime channel: WebSocket upgrade, token handshake, and session
//! registration.
//!
//! The handshake authenticates with the same store-backed check as the
//! HTTP gate, so a logged-out token cannot open a socket either. After
//! the handshake the registry guarantees at most one live connection
//! per user; registering a new one disconnects the old one first.
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use metrics::counter;
use savour_common::{ClientToServer, Identity, ServerToClient};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::SessionHandle;
use crate::metrics as keys;
use crate::store::CredentialStore;
use crate::AppState;

/// Handler for WebSocket connections
pub async fn ws_handler<S>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse
where
    S: CredentialStore + Clone + Send + Sync + 'static,
{
    counter!(keys::WS_CONNECTION).increment(1);
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection<S>(socket: WebSocket, state: Arc<AppState<S>>)
where
    S: CredentialStore + Clone + Send + Sync + 'static,
{
    let (mut tx, mut rx) = socket.split();

    // The connection does nothing until the handshake frame arrives and
    // verifies; no token refresh happens over this channel.
    let identity = match await_hello(&mut rx, state.as_ref()).await {
        Ok(identity) => identity,
        Err(message) => {
            send_json(&mut tx, &ServerToClient::AuthError { message }).await;
            let _ = tx.send(Message::Close(None)).await;
            return;
        },
    };

    if !send_json(
        &mut tx,
        &ServerToClient::Ready {
            user_id: identity.user_id,
        },
    )
    .await
    {
        return;
    }

    let (session_tx, mut session_rx) = mpsc::channel::<ServerToClient>(32);
    let handle = SessionHandle::new(session_tx.clone());
    let connection_id = handle.connection_id;

    // Evicts any previous connection for this user before we go live
    state.sessions.register(identity.user_id, handle).await;
    tracing::info!(user_id = identity.user_id, "realtime session registered");

    // Forward outbound frames; an eviction notice is the last thing a
    // replaced connection ever receives.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = session_rx.recv().await {
            let evicting = matches!(msg, ServerToClient::Evicted { .. });
            let json = serde_json::to_string(&msg).unwrap_or_default();
            if tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            if evicting {
                let _ = tx.send(Message::Close(None)).await;
                break;
            }
        }
    });

    while let Some(Ok(message)) = rx.next().await {
        match message {
            Message::Text(text) => {
                let reply = match serde_json::from_str::<ClientToServer>(&text) {
                    Ok(ClientToServer::AttendanceMarked {
                        student_id,
                        class_id,
                    }) => {
                        tracing::info!(
                            user_id = identity.user_id,
                            student_id,
                            class_id,
                            "attendance marked"
                        );
                        ServerToClient::AttendanceAck {
                            student_id,
                            class_id,
                        }
                    },
                    // The handshake already happened
                    Ok(ClientToServer::Hello { .. }) => ServerToClient::MalformedMessage {
                        err_msg: "handshake already completed".to_string(),
                    },
                    Err(e) => ServerToClient::MalformedMessage {
                        err_msg: e.to_string(),
                    },
                };

                if session_tx.send(reply).await.is_err() {
                    break;
                }
            },
            Message::Close(_) => break,
            _ => {}, // Ignore ping/pong/binary
        }
    }

    // Only removes the entry if it still belongs to this connection; a
    // replaced session's late disconnect must not evict its successor.
    state.sessions.unregister(identity.user_id, connection_id);
    counter!(keys::WS_DISCONNECTION).increment(1);
    send_task.abort();
}

/// Wait for the first frame and authenticate it. Anything other than a
/// `Hello` with a token that passes the store-backed check fails the
/// handshake.
async fn await_hello<S>(
    rx: &mut SplitStream<WebSocket>,
    state: &AppState<S>,
) -> Result<Identity, String>
where
    S: CredentialStore + Clone + Send + Sync + 'static,
{
    let frame = match rx.next().await {
        Some(Ok(Message::Text(text))) => text,
        _ => return Err("Authentication error".to_string()),
    };

    let token = match serde_json::from_str::<ClientToServer>(&frame) {
        Ok(ClientToServer::Hello { token }) if !token.is_empty() => token,
        _ => return Err("Authentication error".to_string()),
    };

    state
        .auth
        .verify_against_store(&token)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "realtime handshake rejected");
            "Authentication error".to_string()
        })
}

async fn send_json(tx: &mut SplitSink<WebSocket, Message>, msg: &ServerToClient) -> bool {
    let json = serde_json::to_string(msg).unwrap_or_default();
    tx.send(Message::Text(json.into())).await.is_ok()
}
