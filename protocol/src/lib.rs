//! Shared message model for the syncpad realtime transport.
//!
//! This crate owns the wire representation used by both `server` and `cli`.
//! Messages are JSON text over a persistent WebSocket, externally tagged on
//! `type` with the lowercase names the browser client matches on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Error returned by [`decode_client`] and [`decode_server`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text could not be decoded as a known message.
    #[error("failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ErrorCode for CodecError {
    fn error_code(&self) -> &'static str {
        "E_PROTOCOL"
    }
}

/// Grepable error code carried on outbound [`ServerMessage::Error`] payloads.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

/// A user visible in the presence set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
}

/// The composite authoritative state broadcast to clients on every change.
///
/// Never stored server-side; assembled from the live stores at broadcast
/// time. Each snapshot fully supersedes the previous one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Present users keyed by username.
    pub users: BTreeMap<String, UserInfo>,
    /// Whole document body. Opaque payload; last writer wins.
    #[serde(rename = "editorContent")]
    pub editor_content: String,
    /// Activity lines, oldest first, e.g. `"alice joined"`.
    #[serde(rename = "userActivity")]
    pub user_activity: Vec<String>,
}

/// Payload of an outbound error message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Grepable code, e.g. `E_NAME_TAKEN`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

/// Client → server messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Join request. Once joined: idempotent re-join for the same name,
    /// rename for a different one.
    UserEvent { username: String },
    /// Replace the whole document body.
    ContentChange { content: String },
}

/// Server → client messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Full-state broadcast, sent to every live connection on each accepted
    /// mutation (including the originator, which reconciles idempotently).
    Snapshot { data: SnapshotData },
    /// Rejection or protocol failure. Terminal for the request, not the
    /// connection.
    Error { data: ErrorData },
}

impl ServerMessage {
    #[must_use]
    pub fn snapshot(data: SnapshotData) -> Self {
        Self::Snapshot { data }
    }

    /// Build a structured error message from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error {
            data: ErrorData { code: err.error_code().to_string(), message: err.to_string() },
        }
    }
}

/// Encode an outbound server message as JSON text.
#[must_use]
pub fn encode_server(msg: &ServerMessage) -> String {
    // Serializing these types is infallible: string keys, derived impls only.
    serde_json::to_string(msg).unwrap_or_default()
}

/// Encode a client message as JSON text.
#[must_use]
pub fn encode_client(msg: &ClientMessage) -> String {
    serde_json::to_string(msg).unwrap_or_default()
}

/// Decode inbound client text.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for unparseable text, an unknown `type`
/// tag, or a missing required field.
pub fn decode_client(text: &str) -> Result<ClientMessage, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode inbound server text.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for unparseable or unknown messages.
pub fn decode_server(text: &str) -> Result<ServerMessage, CodecError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
