//! Connection lifecycle handler
//!
//! Each accepted TCP connection is sniffed once: WebSocket upgrade
//! requests take the tungstenite handshake path, anything else is served
//! as plain HTTP (health endpoint, static files). Upgraded connections
//! get a minted id, a registration with the RelayServer actor, and a pair
//! of pump tasks for the two directions.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::http;
use crate::message::ClientEnvelope;
use crate::server::ServerCommand;
use crate::types::ConnId;

/// Per-connection outbound frame buffer
const FRAME_CHANNEL_SIZE: usize = 32;

/// Largest request head we peek for the upgrade sniff
const MAX_PEEK_BYTES: usize = 4096;

/// Pause between peeks while a partial header block is in flight
const PEEK_RETRY_DELAY: Duration = Duration::from_millis(2);

/// Peek attempt budget before classifying with whatever has arrived
const MAX_PEEK_ATTEMPTS: usize = 128;

/// Handle a new TCP connection
///
/// Dispatches between the WebSocket relay protocol and the auxiliary
/// HTTP surface, then manages the connection until it closes.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    static_root: PathBuf,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // Peek the request head to detect WebSocket upgrade requests
    let request_head = peek_request_head(&stream).await;

    if !is_websocket_upgrade(&request_head) {
        return http::handle_request(stream, cmd_tx, &static_root).await;
    }

    // WebSocket handshake (the handshake re-reads the peeked request)
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let conn_id = ConnId::new();
    info!("Connection {} opened from {}", conn_id, peer_addr);

    // Channel for pre-serialized server → client frames
    let (frame_tx, mut frame_rx) = mpsc::channel::<String>(FRAME_CHANNEL_SIZE);

    if cmd_tx
        .send(ServerCommand::Connect {
            conn_id,
            sender: frame_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register connection {} - server closed", conn_id);
        return Err(AppError::ChannelSend);
    }

    let cmd_tx_read = cmd_tx.clone();

    // Read pump (WebSocket -> ServerCommand)
    let read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ClientEnvelope>(&text) {
                        Ok(envelope) => {
                            if cmd_tx_read
                                .send(ServerCommand::Envelope { conn_id, envelope })
                                .await
                                .is_err()
                            {
                                debug!("Server closed, ending read pump for {}", conn_id);
                                break;
                            }
                        }
                        Err(e) => {
                            // Lenient parsing: drop the frame, keep the connection
                            warn!("Dropping unparseable frame from {}: {}", conn_id, e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", conn_id);
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pong replies are handled by tungstenite
                }
                Ok(_) => {
                    // Binary and other frame types carry no envelopes
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", conn_id, e);
                    break;
                }
            }
        }
        debug!("Read pump ended for {}", conn_id);
    });

    // Write pump (frames -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                debug!("WebSocket send failed, ending write pump");
                break;
            }
        }
        debug!("Write pump ended for connection");

        let _ = ws_sender.close().await;
    });

    // Wait for either pump to finish
    tokio::select! {
        _ = read_task => {
            debug!("Read pump completed for {}", conn_id);
        }
        _ = write_task => {
            debug!("Write pump completed for {}", conn_id);
        }
    }

    // Exactly one disconnect per connection; the actor side is idempotent anyway
    let _ = cmd_tx.send(ServerCommand::Disconnect { conn_id }).await;

    info!("Connection {} closed", conn_id);

    Ok(())
}

/// Peek the request head without consuming it.
///
/// A single `peek` only sees what is already buffered, so an `Upgrade`
/// header trailing the first segment would misclassify the connection.
/// Retries until the header block terminator arrives, the buffer fills,
/// or the attempt budget runs out.
async fn peek_request_head(stream: &TcpStream) -> String {
    let mut buf = [0u8; MAX_PEEK_BYTES];
    let mut last_n = 0;
    for _ in 0..MAX_PEEK_ATTEMPTS {
        let n = match stream.peek(&mut buf).await {
            Ok(n) => n,
            Err(_) => break,
        };
        if n == 0 || n == buf.len() || head_is_complete(&buf[..n]) {
            return String::from_utf8_lossy(&buf[..n]).into_owned();
        }
        if n == last_n {
            tokio::time::sleep(PEEK_RETRY_DELAY).await;
        }
        last_n = n;
    }
    String::from_utf8_lossy(&buf[..last_n]).into_owned()
}

/// True once the buffered bytes contain the end of the header block.
fn head_is_complete(head: &[u8]) -> bool {
    head.windows(4).any(|w| w == b"\r\n\r\n")
}

/// True when the peeked request asks for a WebSocket upgrade.
fn is_websocket_upgrade(request_head: &str) -> bool {
    request_head
        .lines()
        .any(|line| line.to_ascii_lowercase().trim() == "upgrade: websocket")
}
