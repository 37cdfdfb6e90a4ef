//! Connection registry — live connections and snapshot fan-out.
//!
//! DESIGN
//! ======
//! Connections are registered on upgrade and unregistered on socket close.
//! Fan-out iterates every live connection and enqueues best-effort: a full
//! channel drops the message, and the next snapshot supersedes it.

use protocol::ServerMessage;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::services::presence;
use crate::state::{AppState, DocState};

/// Register a connection and deliver the current snapshot, so a late joiner
/// converges before its first event.
pub async fn register(state: &AppState, conn_id: Uuid, tx: mpsc::Sender<ServerMessage>) {
    let mut doc = state.doc.write().await;
    let snapshot = ServerMessage::snapshot(doc.snapshot());
    let _ = tx.try_send(snapshot);
    doc.clients.insert(conn_id, tx);
    info!(%conn_id, clients = doc.clients.len(), "connection registered");
}

/// Unregister a connection. Runs the presence leave path; if a joined user
/// left, the updated snapshot is fanned out to the remaining connections.
/// Unknown ids are a logged no-op. Returns whether a joined user left.
pub async fn unregister(state: &AppState, conn_id: Uuid) -> bool {
    let mut doc = state.doc.write().await;
    if doc.clients.remove(&conn_id).is_none() {
        info!(%conn_id, "unregister for unknown connection");
        return false;
    }

    let left = presence::leave(&mut doc, conn_id, state.config.activity_cap);
    if left {
        let msg = ServerMessage::snapshot(doc.snapshot());
        fan_out(&doc, &msg);
    }
    info!(%conn_id, remaining = doc.clients.len(), "connection unregistered");
    left
}

/// Enqueue a message on every live connection, including the originator.
pub fn fan_out(doc: &DocState, msg: &ServerMessage) {
    for tx in doc.clients.values() {
        // Best-effort: if a client's channel is full, skip it.
        let _ = tx.try_send(msg.clone());
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
