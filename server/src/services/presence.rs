//! Presence manager — join, rename, and leave semantics.
//!
//! DESIGN
//! ======
//! A connection is Unjoined until its first accepted `userevent` and maps to
//! at most one user. Usernames are unique across live connections: a join
//! claiming a name held by another connection is rejected with `NameTaken`.
//! Only presence changes reach the activity feed; edits do not.

use protocol::{ErrorCode, ServerMessage};
use tracing::info;
use uuid::Uuid;

use crate::services::registry;
use crate::state::{ActivityEntry, AppState, DocState, Participant, now_ms};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("username already taken: {0}")]
    NameTaken(String),
    #[error("connection not registered: {0}")]
    UnknownConnection(Uuid),
}

impl ErrorCode for PresenceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyUsername => "E_EMPTY_USERNAME",
            Self::NameTaken(_) => "E_NAME_TAKEN",
            Self::UnknownConnection(_) => "E_UNKNOWN_CONNECTION",
        }
    }
}

/// How an accepted `userevent` changed presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First join on this connection.
    Joined,
    /// Same name re-sent while joined; presence unchanged.
    Rejoined,
    /// Joined connection claimed a new name, releasing the old one.
    Renamed { previous: String },
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Apply a join request and fan out the updated snapshot.
///
/// Mutation, snapshot assembly, and enqueue happen under one write-lock
/// acquisition, so every connection observes presence transitions in the
/// same total order.
///
/// # Errors
///
/// Rejects an empty (post-trim) username, a name held by another live
/// connection, and an unregistered connection id. Rejections leave shared
/// state untouched and fan nothing out.
pub async fn join(state: &AppState, conn_id: Uuid, username: &str) -> Result<JoinOutcome, PresenceError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(PresenceError::EmptyUsername);
    }

    let mut doc = state.doc.write().await;
    if !doc.clients.contains_key(&conn_id) {
        return Err(PresenceError::UnknownConnection(conn_id));
    }
    if doc.name_taken_by_other(conn_id, username) {
        return Err(PresenceError::NameTaken(username.to_owned()));
    }

    let cap = state.config.activity_cap;
    let current = doc.username_of(conn_id).map(str::to_owned);
    let outcome = match current {
        Some(name) if name == username => JoinOutcome::Rejoined,
        Some(previous) => {
            // Rename is leave + join, so the feed reads "<old> left", "<new> joined".
            doc.push_activity(ActivityEntry::new(previous.clone(), "left"), cap);
            doc.participants
                .insert(conn_id, Participant { username: username.to_owned(), joined_at: now_ms() });
            doc.push_activity(ActivityEntry::new(username, "joined"), cap);
            JoinOutcome::Renamed { previous }
        }
        None => {
            doc.participants
                .insert(conn_id, Participant { username: username.to_owned(), joined_at: now_ms() });
            doc.push_activity(ActivityEntry::new(username, "joined"), cap);
            JoinOutcome::Joined
        }
    };

    let msg = ServerMessage::snapshot(doc.snapshot());
    registry::fan_out(&doc, &msg);
    info!(%conn_id, %username, users = doc.participants.len(), ?outcome, "presence updated");
    Ok(outcome)
}

/// Remove the participant on `conn_id`, if any, and log the departure.
/// Returns whether a joined user left. Called from the registry with the
/// session lock already held.
pub fn leave(doc: &mut DocState, conn_id: Uuid, cap: usize) -> bool {
    let Some(participant) = doc.participants.remove(&conn_id) else {
        return false;
    };
    doc.push_activity(ActivityEntry::new(participant.username.clone(), "left"), cap);
    info!(%conn_id, username = %participant.username, remaining = doc.participants.len(), "user left");
    true
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
