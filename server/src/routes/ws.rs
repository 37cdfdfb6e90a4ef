//! WebSocket handler — the broadcast coordinator.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection id and enters a `select!` loop:
//! - Inbound client messages → decode + dispatch by message type
//! - Snapshots fanned out by any mutation → forward to the socket
//!
//! Dispatch is a per-connection state machine with two states, Unjoined and
//! Joined, where Joined means a participant exists for this connection id.
//! Accepted mutations fan the full snapshot out to every connection from
//! inside the services, under the same lock as the mutation; dispatch only
//! returns the error replies owed to the sender.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register connection, deliver current snapshot
//! 2. Client sends messages → dispatch → services mutate + fan out
//! 3. Close → unregister → leave → snapshot to remaining connections

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use protocol::{ClientMessage, ServerMessage, decode_client, encode_server};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::{document, presence, registry};
use crate::state::AppState;

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();

    // Per-connection channel for snapshots fanned out by any mutation.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerMessage>(state.config.client_buffer);
    registry::register(&state, conn_id, client_tx).await;
    info!(%conn_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for reply in process_inbound_text(&state, conn_id, &text).await {
                            let _ = send_message(&mut socket, &reply).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(msg) = client_rx.recv() => {
                if send_message(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
        }
    }

    registry::unregister(&state, conn_id).await;
    info!(%conn_id, "ws: client disconnected");
}

/// Decode and dispatch one inbound text message, returning the error replies
/// owed to the sender. Accepted mutations broadcast from the services and
/// produce no direct reply.
///
/// Split from the socket loop so tests can exercise dispatch end-to-end.
async fn process_inbound_text(state: &AppState, conn_id: Uuid, text: &str) -> Vec<ServerMessage> {
    let msg = match decode_client(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(%conn_id, error = %e, "ws: discarding malformed message");
            return vec![ServerMessage::error_from(&e)];
        }
    };

    match msg {
        ClientMessage::UserEvent { username } => {
            match presence::join(state, conn_id, &username).await {
                Ok(_) => vec![],
                Err(e) => {
                    warn!(%conn_id, error = %e, "ws: join rejected");
                    vec![ServerMessage::error_from(&e)]
                }
            }
        }
        ClientMessage::ContentChange { content } => {
            match document::apply_edit(state, conn_id, content).await {
                Ok(()) => vec![],
                Err(e) => {
                    warn!(%conn_id, error = %e, "ws: edit dropped");
                    vec![ServerMessage::error_from(&e)]
                }
            }
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    socket.send(Message::Text(encode_server(msg).into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
