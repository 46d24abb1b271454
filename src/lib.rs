//! Room-Based WebSocket Chat Relay Library
//!
//! A relay server for browser chat clients built with tokio-tungstenite
//! using the Actor pattern for state management: clients join rooms by
//! opaque string key and the server fans chat, typing, and presence
//! envelopes out to same-room connections.
//!
//! # Features
//! - WebSocket connection handling with stable per-connection ids
//! - Implicit room creation/deletion driven by membership
//! - Server-stamped message identity (author, timestamp, id)
//! - Typing indicators and join/leave presence broadcasts
//! - Lenient parsing: malformed frames are dropped, never fatal
//! - Auxiliary HTTP surface on the same port: `/health` + static files
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `RelayServer` is the central actor owning all state
//! - The `Router` turns each inbound envelope into (recipients, envelope)
//!   broadcasts, keeping protocol logic free of sockets
//! - Each connection has a handler task communicating with the actor
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use std::path::PathBuf;
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_relay::{handle_connection, RelayServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("0.0.0.0:3001").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(RelayServer::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx, PathBuf::from("public")));
//!     }
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod message;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use broadcast::PeerMap;
pub use config::Config;
pub use error::AppError;
pub use handler::handle_connection;
pub use message::{ClientEnvelope, ServerEnvelope};
pub use registry::{Binding, ConnectionRegistry};
pub use rooms::RoomIndex;
pub use router::{Outbound, Router};
pub use server::{RelayServer, ServerCommand, ServerStats};
pub use types::{ConnId, RoomId};
