//! Basic type definitions for the relay server
//!
//! Provides newtype wrappers for type safety:
//! - `ConnId`: UUID-based unique connection identifier
//! - `RoomId`: opaque client-chosen room key
//!
//! Plus helpers for server-stamped message ids and timestamps.

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 minted at accept time. Implements Hash and Eq
/// for use as HashMap keys in the registry, room index, and peer map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub Uuid);

impl ConnId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier
///
/// An opaque, case-sensitive string chosen by the client. Rooms are
/// created implicitly on first join, so any string is a valid key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generate a fresh message id.
///
/// Hex-encoded epoch milliseconds plus a random alphanumeric suffix:
/// unique with high probability across the process lifetime, including
/// ids generated within the same millisecond. Clients treat the id as
/// an opaque string.
pub fn generate_message_id() -> String {
    use rand::Rng;
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{millis:x}-{suffix}")
}

/// Current server time as an ISO-8601 / RFC 3339 UTC string with
/// millisecond precision (the shape of JavaScript's `Date.toISOString()`).
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
