//! Message router
//!
//! Interprets inbound envelopes and mutates the registry and room index,
//! returning the broadcasts to perform instead of sending inline. Keeping
//! the protocol logic pure of sockets lets the whole state machine be unit
//! tested with fake connection ids; the relay actor executes the returned
//! effects through the peer map.
//!
//! State machine per connection: `Unjoined → Joined(room)`. A `join` while
//! already joined switches rooms (leaving the old one first); `message`
//! and typing envelopes before any `join` are dropped.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::message::{strip_reserved_fields, ClientEnvelope, ServerEnvelope};
use crate::registry::{Binding, ConnectionRegistry};
use crate::rooms::RoomIndex;
use crate::types::{generate_message_id, iso_timestamp, ConnId, RoomId};

/// Display name used when a `join` envelope carries no username.
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// One broadcast to perform: an envelope and the connections to send it to.
#[derive(Debug)]
pub struct Outbound {
    pub recipients: Vec<ConnId>,
    pub envelope: ServerEnvelope,
}

/// Protocol state machine over the registry and room index.
#[derive(Debug, Default)]
pub struct Router {
    registry: ConnectionRegistry,
    rooms: RoomIndex,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one parsed inbound envelope, returning the broadcasts to run.
    pub fn dispatch(&mut self, conn: ConnId, envelope: ClientEnvelope) -> Vec<Outbound> {
        match envelope {
            ClientEnvelope::Join { room, username } => self.handle_join(conn, room, username),
            ClientEnvelope::Message { content, extra } => self.handle_message(conn, content, extra),
            ClientEnvelope::TypingStart => self.handle_typing(conn, true),
            ClientEnvelope::TypingStop => self.handle_typing(conn, false),
        }
    }

    /// Handle a closed or errored connection.
    ///
    /// Idempotent: the first call unbinds and announces the departure,
    /// any further call finds no binding and returns nothing.
    pub fn connection_closed(&mut self, conn: ConnId) -> Vec<Outbound> {
        let Some(binding) = self.registry.unbind(conn) else {
            return Vec::new();
        };

        self.rooms.leave(&binding.room, conn);
        let remaining = self.rooms.members(&binding.room);
        info!(
            "Connection {} left room '{}' ({} remaining)",
            conn,
            binding.room,
            remaining.len()
        );

        if remaining.is_empty() {
            return Vec::new();
        }

        vec![Outbound {
            recipients: remaining,
            envelope: ServerEnvelope::UserLeft {
                username: binding.display_name,
                room: binding.room.0,
                timestamp: iso_timestamp(),
            },
        }]
    }

    /// Number of live rooms, for the health endpoint.
    pub fn room_count(&self) -> usize {
        self.rooms.room_count()
    }

    /// Read access to the room index (stats, tests).
    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    fn handle_join(&mut self, conn: ConnId, room: String, username: Option<String>) -> Vec<Outbound> {
        let room = RoomId::new(room);

        // Switching rooms implicitly leaves the old one
        if let Some(prior) = self.registry.lookup(conn).cloned() {
            self.rooms.leave(&prior.room, conn);
        }

        let name = username.unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
        self.registry
            .bind(conn, Binding::new(room.clone(), name.clone()));
        self.rooms.join(&room, conn);

        let members = self.rooms.members(&room);
        info!(
            "Connection {} joined room '{}' as '{}' ({} members)",
            conn,
            room,
            name,
            members.len()
        );

        let mut out = Vec::new();

        let others: Vec<ConnId> = members.iter().copied().filter(|&c| c != conn).collect();
        if !others.is_empty() {
            out.push(Outbound {
                recipients: others,
                envelope: ServerEnvelope::UserJoined {
                    username: name,
                    room: room.0.clone(),
                    timestamp: iso_timestamp(),
                },
            });
        }

        // Ack goes to the joiner alone, with the post-join member count
        out.push(Outbound {
            recipients: vec![conn],
            envelope: ServerEnvelope::RoomJoined {
                room: room.0,
                members: members.len(),
            },
        });

        out
    }

    fn handle_message(
        &mut self,
        conn: ConnId,
        content: String,
        mut extra: Map<String, Value>,
    ) -> Vec<Outbound> {
        let Some(binding) = self.registry.lookup(conn) else {
            debug!("Dropping message from unjoined connection {}", conn);
            return Vec::new();
        };

        strip_reserved_fields(&mut extra);

        let envelope = ServerEnvelope::Message {
            id: generate_message_id(),
            author: binding.display_name.clone(),
            content,
            timestamp: iso_timestamp(),
            room: binding.room.0.clone(),
            extra,
        };

        // The sender is included: clients render from the server echo
        vec![Outbound {
            recipients: self.rooms.members(&binding.room),
            envelope,
        }]
    }

    fn handle_typing(&mut self, conn: ConnId, started: bool) -> Vec<Outbound> {
        let Some(binding) = self.registry.lookup(conn) else {
            debug!("Dropping typing indicator from unjoined connection {}", conn);
            return Vec::new();
        };

        let recipients: Vec<ConnId> = self
            .rooms
            .members(&binding.room)
            .into_iter()
            .filter(|&c| c != conn)
            .collect();
        if recipients.is_empty() {
            return Vec::new();
        }

        let username = binding.display_name.clone();
        let room = binding.room.0.clone();
        let envelope = if started {
            ServerEnvelope::TypingStart { username, room }
        } else {
            ServerEnvelope::TypingStop { username, room }
        };

        vec![Outbound {
            recipients,
            envelope,
        }]
    }
}
