//! Connection registry
//!
//! Maps each live connection to its current (room, display name) binding.
//! A connection owns zero or one binding at a time; joining a new room
//! replaces the old binding.

use std::collections::HashMap;

use crate::types::{ConnId, RoomId};

/// The (room, display name) pair bound to a connection at join time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub room: RoomId,
    pub display_name: String,
}

impl Binding {
    pub fn new(room: RoomId, display_name: impl Into<String>) -> Self {
        Self {
            room,
            display_name: display_name.into(),
        }
    }
}

/// Connection → binding map.
///
/// Purely in-memory; rebuilt empty on every process restart.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    bindings: HashMap<ConnId, Binding>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the binding for a connection.
    pub fn bind(&mut self, conn: ConnId, binding: Binding) {
        self.bindings.insert(conn, binding);
    }

    /// Clear a connection's binding, returning the prior one if any.
    ///
    /// Unbinding an unbound connection is a no-op.
    pub fn unbind(&mut self, conn: ConnId) -> Option<Binding> {
        self.bindings.remove(&conn)
    }

    /// Current binding for a connection, if bound.
    pub fn lookup(&self, conn: ConnId) -> Option<&Binding> {
        self.bindings.get(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_lookup() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnId::new();

        assert!(registry.lookup(conn).is_none());

        registry.bind(conn, Binding::new(RoomId::new("general"), "Alice"));

        let binding = registry.lookup(conn).unwrap();
        assert_eq!(binding.room, RoomId::new("general"));
        assert_eq!(binding.display_name, "Alice");
    }

    #[test]
    fn test_rebind_replaces() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnId::new();

        registry.bind(conn, Binding::new(RoomId::new("general"), "Alice"));
        registry.bind(conn, Binding::new(RoomId::new("random"), "Alice"));

        assert_eq!(registry.lookup(conn).unwrap().room, RoomId::new("random"));
    }

    #[test]
    fn test_unbind_returns_prior() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnId::new();

        registry.bind(conn, Binding::new(RoomId::new("general"), "Alice"));

        let prior = registry.unbind(conn).unwrap();
        assert_eq!(prior.room, RoomId::new("general"));
        assert!(registry.lookup(conn).is_none());
    }

    #[test]
    fn test_unbind_unbound_is_noop() {
        let mut registry = ConnectionRegistry::new();
        assert!(registry.unbind(ConnId::new()).is_none());
    }
}
