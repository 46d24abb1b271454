//! Room index
//!
//! Maps each room id to the set of connections currently joined to it.
//! Rooms exist only while they have members: created implicitly on first
//! join, deleted when the last member leaves.

use std::collections::{HashMap, HashSet};

use crate::types::{ConnId, RoomId};

/// Room → member-set map.
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: HashMap<RoomId, HashSet<ConnId>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room if absent.
    ///
    /// Idempotent: re-joining a room the connection is already in does
    /// not duplicate membership.
    pub fn join(&mut self, room: &RoomId, conn: ConnId) {
        self.rooms.entry(room.clone()).or_default().insert(conn);
    }

    /// Remove a connection from a room, deleting the room entry when the
    /// member set empties. Leaving a room the connection is not in is a
    /// no-op.
    pub fn leave(&mut self, room: &RoomId, conn: ConnId) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }

    /// Snapshot of a room's current members.
    ///
    /// Returns a copy, never a live view: broadcast iteration must
    /// tolerate membership changes triggered mid-delivery.
    pub fn members(&self, room: &RoomId) -> Vec<ConnId> {
        self.rooms
            .get(room)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of members currently in a room (0 if the room is absent).
    pub fn member_count(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map(HashSet::len).unwrap_or(0)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
