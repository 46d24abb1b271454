//! Plain HTTP surface
//!
//! Handles connections that are not WebSocket upgrades: `GET /health`
//! returns live connection/room counts, and every other path is a static
//! file lookup under the configured root. Responses are written by hand
//! on the raw stream; requests this small need no HTTP library.

use std::path::{Component, Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::server::ServerCommand;

/// Largest request we bother reading; headers past this are irrelevant.
const MAX_REQUEST_BYTES: usize = 8192;

/// Handle one plain-HTTP connection end to end.
pub async fn handle_request(
    mut stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    static_root: &Path,
) -> Result<(), AppError> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let first_line = request.lines().next().unwrap_or("");
    let Some((method, path)) = parse_request_line(first_line) else {
        return Ok(());
    };

    if method != "GET" {
        write_response(&mut stream, "405 Method Not Allowed", "text/plain", b"Method Not Allowed")
            .await?;
        return Ok(());
    }

    if path == "/health" {
        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::Stats { reply: reply_tx })
            .await
            .map_err(|_| AppError::ChannelSend)?;
        let stats = reply_rx.await.map_err(|_| AppError::ChannelSend)?;

        let body = serde_json::to_vec(&serde_json::json!({
            "status": "ok",
            "connections": stats.connections,
            "rooms": stats.rooms,
        }))?;
        write_response(&mut stream, "200 OK", "application/json", &body).await?;
        return Ok(());
    }

    serve_static(&mut stream, static_root, path).await
}

/// Parse `"GET /path?query HTTP/1.1"` into (method, path-without-query).
fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let path = target.split('?').next().unwrap_or(target);
    Some((method, path))
}

/// Map a request path to a file under the served root.
///
/// Returns `None` when the path steps outside the root (`..` components);
/// such requests are answered with 403. `/` maps to `index.html`.
fn resolve_request_path(root: &Path, path: &str) -> Option<PathBuf> {
    let relative = path.trim_start_matches('/');
    let relative = if relative.is_empty() {
        "index.html"
    } else {
        relative
    };

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            // ParentDir, RootDir, Prefix all escape the served root
            _ => return None,
        }
    }
    Some(resolved)
}

async fn serve_static(
    stream: &mut TcpStream,
    root: &Path,
    path: &str,
) -> Result<(), AppError> {
    let Some(candidate) = resolve_request_path(root, path) else {
        warn!("Rejecting path traversal attempt: {}", path);
        write_response(stream, "403 Forbidden", "text/plain", b"Forbidden").await?;
        return Ok(());
    };

    // Symlink escapes get caught after resolution; a missing file is a 404
    match tokio::fs::canonicalize(&candidate).await {
        Ok(resolved) => {
            let within_root = match tokio::fs::canonicalize(root).await {
                Ok(canonical_root) => resolved.starts_with(&canonical_root),
                Err(_) => false,
            };
            if !within_root {
                warn!("Resolved path escapes static root: {}", resolved.display());
                write_response(stream, "403 Forbidden", "text/plain", b"Forbidden").await?;
                return Ok(());
            }

            match tokio::fs::read(&resolved).await {
                Ok(body) => {
                    write_response(stream, "200 OK", content_type(&resolved), &body).await?;
                }
                Err(_) => {
                    // Directories land here too
                    write_response(stream, "404 Not Found", "text/plain", b"Not Found").await?;
                }
            }
        }
        Err(_) => {
            debug!("Static miss: {}", candidate.display());
            write_response(stream, "404 Not Found", "text/plain", b"Not Found").await?;
        }
    }
    Ok(())
}

/// Content-Type from the file extension; octet-stream fallback.
fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

async fn write_response(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), AppError> {
    let header = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(body).await?;
    Ok(())
}
