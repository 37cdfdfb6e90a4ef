//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the config plus the single shared editing session: the connection
//! registry, the presence map, the document body, and the capped activity
//! log. All four live behind one `RwLock` so every mutation and its
//! broadcast happen within one lock acquisition (see `services`).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use protocol::{ServerMessage, SnapshotData, UserInfo};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::Config;

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// A joined user, attributed to exactly one live connection.
#[derive(Debug, Clone)]
pub struct Participant {
    pub username: String,
    pub joined_at: i64,
}

/// One entry of the activity feed. Immutable once appended.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub username: String,
    pub description: String,
    pub ts: i64,
}

impl ActivityEntry {
    pub fn new(username: impl Into<String>, description: impl Into<String>) -> Self {
        Self { username: username.into(), description: description.into(), ts: now_ms() }
    }

    /// Render as the wire form, e.g. `"alice joined"`.
    #[must_use]
    pub fn line(&self) -> String {
        format!("{} {}", self.username, self.description)
    }
}

/// The single shared editing session. In memory for the process lifetime;
/// lost on restart.
pub struct DocState {
    /// Live connections: connection id -> sender for outgoing messages.
    pub clients: HashMap<Uuid, mpsc::Sender<ServerMessage>>,
    /// Joined users keyed by connection id. Absence means Unjoined.
    pub participants: HashMap<Uuid, Participant>,
    /// Authoritative document body. Whole-document last-write-wins.
    pub content: String,
    /// Activity feed, oldest first, capped by config.
    pub activity: VecDeque<ActivityEntry>,
}

impl DocState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            participants: HashMap::new(),
            content: String::new(),
            activity: VecDeque::new(),
        }
    }

    /// Assemble the composite read-only view broadcast to clients.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotData {
        let users = self
            .participants
            .values()
            .map(|p| (p.username.clone(), UserInfo { username: p.username.clone() }))
            .collect();
        SnapshotData {
            users,
            editor_content: self.content.clone(),
            user_activity: self.activity.iter().map(ActivityEntry::line).collect(),
        }
    }

    /// Append an activity entry, evicting the oldest beyond `cap`.
    pub fn push_activity(&mut self, entry: ActivityEntry, cap: usize) {
        self.activity.push_back(entry);
        while self.activity.len() > cap {
            self.activity.pop_front();
        }
    }

    /// Username of the joined user on `conn_id`, if any.
    #[must_use]
    pub fn username_of(&self, conn_id: Uuid) -> Option<&str> {
        self.participants.get(&conn_id).map(|p| p.username.as_str())
    }

    /// Whether another live connection already holds `username`.
    #[must_use]
    pub fn name_taken_by_other(&self, conn_id: Uuid, username: &str) -> bool {
        self.participants
            .iter()
            .any(|(id, p)| *id != conn_id && p.username == username)
    }
}

impl Default for DocState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — the session store is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub doc: Arc<RwLock<DocState>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config, doc: Arc::new(RwLock::new(DocState::new())) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// App state with default config.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(Config::default())
    }

    /// Insert a probe connection directly and return its id and receiver.
    pub async fn attach_client(state: &AppState) -> (Uuid, mpsc::Receiver<ServerMessage>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(8);
        state.doc.write().await.clients.insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Join a user directly, bypassing dispatch. No activity is logged.
    pub async fn seed_participant(state: &AppState, conn_id: Uuid, username: &str) {
        state.doc.write().await.participants.insert(
            conn_id,
            Participant { username: username.to_owned(), joined_at: now_ms() },
        );
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
