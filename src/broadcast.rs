//! Broadcaster
//!
//! Owns the peer map (connection id → outbound frame channel) and fans
//! envelopes out to recipient sets chosen by the router. Envelopes are
//! serialized exactly once per broadcast; each connection's write task
//! drains its channel onto the socket.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::message::ServerEnvelope;
use crate::types::ConnId;

/// Connection id → sender of pre-serialized JSON frames.
#[derive(Debug, Default)]
pub struct PeerMap {
    senders: HashMap<ConnId, mpsc::Sender<String>>,
}

impl PeerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, conn: ConnId, sender: mpsc::Sender<String>) {
        self.senders.insert(conn, sender);
    }

    pub fn remove(&mut self, conn: ConnId) {
        self.senders.remove(&conn);
    }

    /// Number of open connections, for the health endpoint.
    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }

    /// Send one envelope to every listed recipient.
    ///
    /// Serializes once. Delivery is fire-and-forget: a recipient no
    /// longer in the map (disconnected between snapshot and delivery) is
    /// skipped, and a closed or backlogged channel is a logged
    /// per-recipient failure that never blocks the caller or aborts
    /// delivery to the remaining recipients.
    pub fn broadcast(&self, recipients: &[ConnId], envelope: &ServerEnvelope) {
        let frame = match serde_json::to_string(envelope) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize outbound envelope: {}", e);
                return;
            }
        };

        for conn in recipients {
            let Some(sender) = self.senders.get(conn) else {
                continue;
            };
            match sender.try_send(frame.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Dropping frame for backlogged connection {}", conn);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!("Dropping frame for closed connection {}", conn);
                }
            }
        }
    }
}
