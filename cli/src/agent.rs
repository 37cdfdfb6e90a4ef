//! Client synchronization agent.
//!
//! Maintains a local mirror of the authoritative snapshot over a persistent
//! WebSocket: connect, join, replace the whole mirror on every inbound
//! snapshot, reconnect on any transport drop with capped exponential
//! backoff, and re-send the join on reconnect to re-establish presence.

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use protocol::{ClientMessage, ServerMessage, SnapshotData, UserInfo, encode_client};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::CliError;

pub const INITIAL_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;

pub type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Local replica of the authoritative state. Replaced wholesale on every
/// snapshot, never patched incrementally.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub users: BTreeMap<String, UserInfo>,
    pub content: String,
    pub activity: Vec<String>,
}

impl Mirror {
    /// Merge an inbound message. Snapshots replace the whole mirror; error
    /// messages leave it untouched. Returns whether anything changed.
    pub fn apply(&mut self, msg: &ServerMessage) -> bool {
        match msg {
            ServerMessage::Snapshot { data } => {
                let changed = self.users != data.users
                    || self.content != data.editor_content
                    || self.activity != data.user_activity;
                self.users = data.users.clone();
                self.content = data.editor_content.clone();
                self.activity = data.user_activity.clone();
                changed
            }
            ServerMessage::Error { .. } => false,
        }
    }

    /// The snapshot form of the mirror, for rendering.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotData {
        SnapshotData {
            users: self.users.clone(),
            editor_content: self.content.clone(),
            user_activity: self.activity.clone(),
        }
    }
}

/// Next reconnect delay: double, capped at `max_ms`.
#[must_use]
pub fn next_backoff(current_ms: u64, max_ms: u64) -> u64 {
    current_ms.saturating_mul(2).min(max_ms)
}

pub struct AgentOptions {
    pub username: String,
    /// Backoff ceiling; delays double from [`INITIAL_BACKOFF_MS`] up to here.
    pub max_backoff_ms: u64,
}

/// Run the agent until a fatal rejection. Transport drops reconnect forever;
/// `on_update` fires after every mirror change.
pub async fn run(
    url: &str,
    options: &AgentOptions,
    mut on_update: impl FnMut(&Mirror),
) -> Result<(), CliError> {
    let mut mirror = Mirror::default();
    let mut backoff_ms = INITIAL_BACKOFF_MS;
    let max_backoff_ms = options.max_backoff_ms.max(INITIAL_BACKOFF_MS);

    loop {
        match connect_and_sync(url, options, &mut mirror, &mut on_update).await {
            Err(e @ CliError::Rejected { .. }) => return Err(e),
            Ok(()) => eprintln!("disconnected, reconnecting in {backoff_ms}ms"),
            Err(e) => eprintln!("connection error: {e}, reconnecting in {backoff_ms}ms"),
        }
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        backoff_ms = next_backoff(backoff_ms, max_backoff_ms);
    }
}

/// One connection lifetime: join, then mirror snapshots until the socket
/// drops. A clean close returns `Ok`.
async fn connect_and_sync(
    url: &str,
    options: &AgentOptions,
    mirror: &mut Mirror,
    on_update: &mut impl FnMut(&Mirror),
) -> Result<(), CliError> {
    let (mut ws, _) = connect_async(url)
        .await
        .map_err(|e| CliError::WsConnect(Box::new(e)))?;

    // Re-establish presence on every (re)connect.
    let join = ClientMessage::UserEvent { username: options.username.clone() };
    ws.send(Message::Text(encode_client(&join).into()))
        .await
        .map_err(|e| CliError::Ws(Box::new(e)))?;

    while let Some(msg) = ws.next().await {
        let msg = msg.map_err(|e| CliError::Ws(Box::new(e)))?;
        match msg {
            Message::Text(text) => {
                // Malformed server text is skipped; the next snapshot supersedes.
                let Ok(server_msg) = protocol::decode_server(text.as_str()) else {
                    continue;
                };
                if let ServerMessage::Error { data } = &server_msg {
                    if data.code == "E_NAME_TAKEN" || data.code == "E_EMPTY_USERNAME" {
                        return Err(CliError::Rejected {
                            code: data.code.clone(),
                            message: data.message.clone(),
                        });
                    }
                    eprintln!("server error [{}]: {}", data.code, data.message);
                    continue;
                }
                if mirror.apply(&server_msg) {
                    on_update(mirror);
                }
            }
            Message::Close(_) => return Ok(()),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "agent_test.rs"]
mod tests;
