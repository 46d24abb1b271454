//! Envelope protocol definitions
//!
//! JSON-based bidirectional envelope protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Every envelope carries a
//! `type` discriminant; anything that fails to parse is dropped by the
//! connection handler without closing the connection: lenient parsing,
//! since the protocol has no error envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields of an outbound `message` envelope the server owns.
///
/// Client-supplied values for these are discarded before the inbound
/// extras are copied onto the outbound envelope.
const RESERVED_MESSAGE_FIELDS: &[&str] = &["type", "id", "author", "content", "timestamp", "room"];

/// Client → Server envelope
///
/// All envelopes from client to server. Uses tagged enum with snake_case naming.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEnvelope {
    /// Bind this connection to a room (re-join switches rooms)
    Join {
        room: String,
        /// Display name; "Anonymous" when absent
        username: Option<String>,
    },
    /// Send a chat message to the bound room
    Message {
        content: String,
        /// Unknown fields ride along and are echoed back out
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// Typing indicator started
    TypingStart,
    /// Typing indicator stopped
    TypingStop,
}

/// Server → Client envelope
///
/// All envelopes from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEnvelope {
    /// Join acknowledgment, sent to the joining connection only
    RoomJoined { room: String, members: usize },
    /// Presence: a user joined the room (excludes the joiner)
    UserJoined {
        username: String,
        room: String,
        timestamp: String,
    },
    /// Presence: a user left the room
    UserLeft {
        username: String,
        room: String,
        timestamp: String,
    },
    /// Chat message, stamped with server-authoritative id/author/timestamp
    Message {
        id: String,
        author: String,
        content: String,
        timestamp: String,
        room: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// Typing indicator started (excludes the typist)
    TypingStart { username: String, room: String },
    /// Typing indicator stopped (excludes the typist)
    TypingStop { username: String, room: String },
}

/// Drop server-owned keys from a client-supplied extras map.
///
/// Keeps the outbound JSON well-formed (no duplicate keys) and guarantees
/// the server-stamped fields win over anything the client sent.
pub fn strip_reserved_fields(extra: &mut Map<String, Value>) {
    for key in RESERVED_MESSAGE_FIELDS {
        extra.remove(*key);
    }
}
