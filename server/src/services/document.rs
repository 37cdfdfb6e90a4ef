//! Document state — whole-document edits and snapshot assembly.

use protocol::{ErrorCode, ServerMessage, SnapshotData};
use tracing::debug;
use uuid::Uuid;

use crate::services::registry;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Content change from a connection that never joined. The edit is
    /// dropped without touching shared state.
    #[error("connection {0} has not joined")]
    NotJoined(Uuid),
}

impl ErrorCode for DocumentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotJoined(_) => "E_NOT_JOINED",
        }
    }
}

/// Replace the document body and fan out the updated snapshot.
///
/// Whole-document last-write-wins: no diffing, no merge. Edits append no
/// activity entry; only presence changes are logged.
///
/// # Errors
///
/// Returns [`DocumentError::NotJoined`] when the connection has not joined;
/// the document is left unchanged and nothing is fanned out.
pub async fn apply_edit(state: &AppState, conn_id: Uuid, content: String) -> Result<(), DocumentError> {
    let mut doc = state.doc.write().await;
    if !doc.participants.contains_key(&conn_id) {
        return Err(DocumentError::NotJoined(conn_id));
    }

    doc.content = content;
    debug!(%conn_id, bytes = doc.content.len(), "content replaced");

    let msg = ServerMessage::snapshot(doc.snapshot());
    registry::fan_out(&doc, &msg);
    Ok(())
}

/// Assemble the current composite read-only view.
pub async fn snapshot(state: &AppState) -> SnapshotData {
    state.doc.read().await.snapshot()
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
