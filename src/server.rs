//! RelayServer actor implementation
//!
//! The central actor owning all mutable state: the router (registry +
//! room index) and the peer map. Uses the Actor pattern with mpsc
//! channels for message passing: connection handlers never touch shared
//! state directly, so every command is applied atomically with no locks
//! and no await between reading and writing the maps.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::broadcast::PeerMap;
use crate::message::ClientEnvelope;
use crate::router::{Outbound, Router};
use crate::types::ConnId;

/// Commands sent from connection handlers to the RelayServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection accepted; no room binding yet
    Connect {
        conn_id: ConnId,
        sender: mpsc::Sender<String>,
    },
    /// Connection closed or errored
    Disconnect { conn_id: ConnId },
    /// A parsed inbound envelope from a connection
    Envelope {
        conn_id: ConnId,
        envelope: ClientEnvelope,
    },
    /// Snapshot of live connection/room counts (health endpoint)
    Stats { reply: oneshot::Sender<ServerStats> },
}

/// Counts reported by `GET /health`.
#[derive(Debug, Clone, Copy)]
pub struct ServerStats {
    pub connections: usize,
    pub rooms: usize,
}

/// The main RelayServer actor
///
/// Drains the command channel and executes the broadcasts the router
/// returns for each event.
pub struct RelayServer {
    router: Router,
    peers: PeerMap,
    receiver: mpsc::Receiver<ServerCommand>,
}

impl RelayServer {
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            router: Router::new(),
            peers: PeerMap::new(),
            receiver,
        }
    }

    /// Run the RelayServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("RelayServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("RelayServer shutting down");
    }

    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { conn_id, sender } => {
                info!("Connection {} registered", conn_id);
                self.peers.insert(conn_id, sender);
                debug!(
                    "Total connections: {}, total rooms: {}",
                    self.peers.connection_count(),
                    self.router.room_count()
                );
            }
            ServerCommand::Disconnect { conn_id } => {
                // Remove the peer first so the departure broadcast never
                // targets the closed channel, then announce it. A second
                // Disconnect for the same connection is a no-op.
                self.peers.remove(conn_id);
                let out = self.router.connection_closed(conn_id);
                self.execute(out);
                debug!(
                    "Total connections: {}, total rooms: {}",
                    self.peers.connection_count(),
                    self.router.room_count()
                );
            }
            ServerCommand::Envelope { conn_id, envelope } => {
                let out = self.router.dispatch(conn_id, envelope);
                self.execute(out);
            }
            ServerCommand::Stats { reply } => {
                let _ = reply.send(ServerStats {
                    connections: self.peers.connection_count(),
                    rooms: self.router.room_count(),
                });
            }
        }
    }

    fn execute(&self, outbound: Vec<Outbound>) {
        for out in outbound {
            self.peers.broadcast(&out.recipients, &out.envelope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    /// Spawn an actor and return its command channel.
    fn start_server() -> mpsc::Sender<ServerCommand> {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(RelayServer::new(cmd_rx).run());
        cmd_tx
    }

    async fn connect(cmd_tx: &mpsc::Sender<ServerCommand>) -> (ConnId, mpsc::Receiver<String>) {
        let conn_id = ConnId::new();
        let (tx, rx) = mpsc::channel(16);
        cmd_tx
            .send(ServerCommand::Connect { conn_id, sender: tx })
            .await
            .unwrap();
        (conn_id, rx)
    }

    async fn send_json(cmd_tx: &mpsc::Sender<ServerCommand>, conn_id: ConnId, json: &str) {
        let envelope: ClientEnvelope = serde_json::from_str(json).unwrap();
        cmd_tx
            .send(ServerCommand::Envelope { conn_id, envelope })
            .await
            .unwrap();
    }

    async fn recv_value(rx: &mut mpsc::Receiver<String>) -> Value {
        let frame = rx.recv().await.expect("frame");
        serde_json::from_str(&frame).expect("valid JSON frame")
    }

    #[tokio::test]
    async fn test_join_and_chat_round_trip() {
        let cmd_tx = start_server();
        let (a, mut rx_a) = connect(&cmd_tx).await;
        let (b, mut rx_b) = connect(&cmd_tx).await;

        send_json(&cmd_tx, a, r#"{"type":"join","room":"general","username":"Alice"}"#).await;
        assert_eq!(recv_value(&mut rx_a).await["type"], "room_joined");

        send_json(&cmd_tx, b, r#"{"type":"join","room":"general","username":"Bob"}"#).await;
        let joined = recv_value(&mut rx_a).await;
        assert_eq!(joined["type"], "user_joined");
        assert_eq!(joined["username"], "Bob");
        assert_eq!(recv_value(&mut rx_b).await["type"], "room_joined");

        send_json(&cmd_tx, a, r#"{"type":"message","content":"hi"}"#).await;
        let msg_a = recv_value(&mut rx_a).await;
        let msg_b = recv_value(&mut rx_b).await;
        assert_eq!(msg_a["content"], "hi");
        assert_eq!(msg_a["author"], "Alice");
        // Both copies carry the same server-stamped identity
        assert_eq!(msg_a["id"], msg_b["id"]);
        assert_eq!(msg_a["timestamp"], msg_b["timestamp"]);
    }

    #[tokio::test]
    async fn test_disconnect_announces_user_left() {
        let cmd_tx = start_server();
        let (a, mut rx_a) = connect(&cmd_tx).await;
        let (b, mut rx_b) = connect(&cmd_tx).await;

        send_json(&cmd_tx, a, r#"{"type":"join","room":"general","username":"Alice"}"#).await;
        send_json(&cmd_tx, b, r#"{"type":"join","room":"general","username":"Bob"}"#).await;
        recv_value(&mut rx_a).await; // room_joined
        recv_value(&mut rx_a).await; // user_joined(Bob)
        recv_value(&mut rx_b).await; // room_joined

        cmd_tx
            .send(ServerCommand::Disconnect { conn_id: a })
            .await
            .unwrap();
        // Double disconnect (error then close) must not re-announce
        cmd_tx
            .send(ServerCommand::Disconnect { conn_id: a })
            .await
            .unwrap();

        let left = recv_value(&mut rx_b).await;
        assert_eq!(left["type"], "user_left");
        assert_eq!(left["username"], "Alice");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_backlogged_peer_does_not_halt_the_actor() {
        let cmd_tx = start_server();

        // Stalled peer: capacity-1 frame channel that is never drained
        let stalled = ConnId::new();
        let (tx_stalled, _rx_stalled) = mpsc::channel(1);
        cmd_tx
            .send(ServerCommand::Connect {
                conn_id: stalled,
                sender: tx_stalled,
            })
            .await
            .unwrap();
        // The join ack fills the stalled peer's only slot
        send_json(&cmd_tx, stalled, r#"{"type":"join","room":"general","username":"Slow"}"#).await;

        let (b, mut rx_b) = connect(&cmd_tx).await;
        send_json(&cmd_tx, b, r#"{"type":"join","room":"general","username":"Bob"}"#).await;
        assert_eq!(recv_value(&mut rx_b).await["type"], "room_joined");

        // Every frame to the stalled peer from here on is dropped, yet the
        // actor keeps routing for everyone else
        send_json(&cmd_tx, b, r#"{"type":"message","content":"still here"}"#).await;
        let msg = recv_value(&mut rx_b).await;
        assert_eq!(msg["type"], "message");
        assert_eq!(msg["content"], "still here");

        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::Stats { reply: reply_tx })
            .await
            .unwrap();
        assert_eq!(reply_rx.await.unwrap().connections, 2);
    }

    #[tokio::test]
    async fn test_stats_reflect_connections_and_rooms() {
        let cmd_tx = start_server();
        let (a, _rx_a) = connect(&cmd_tx).await;
        let (_b, _rx_b) = connect(&cmd_tx).await;

        send_json(&cmd_tx, a, r#"{"type":"join","room":"general","username":"Alice"}"#).await;

        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::Stats { reply: reply_tx })
            .await
            .unwrap();
        let stats = reply_rx.await.unwrap();

        assert_eq!(stats.connections, 2);
        assert_eq!(stats.rooms, 1);
    }
}
