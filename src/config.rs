//! Environment configuration
//!
//! No CLI flags: the listening port and static file root come from
//! process environment variables with fixed fallbacks.

use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3001;

/// Default static file root, relative to the working directory
pub const DEFAULT_STATIC_ROOT: &str = "public";

/// Runtime configuration read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to listen on (`PORT`)
    pub port: u16,
    /// Directory served for non-`/health` HTTP requests (`STATIC_ROOT`)
    pub static_root: PathBuf,
}

impl Config {
    /// Read configuration from `PORT` and `STATIC_ROOT`.
    pub fn from_env() -> Self {
        Self::from_vars(env::var("PORT").ok(), env::var("STATIC_ROOT").ok())
    }

    fn from_vars(port: Option<String>, static_root: Option<String>) -> Self {
        let port = match port {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Invalid PORT value '{}', using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };
        let static_root =
            PathBuf::from(static_root.unwrap_or_else(|| DEFAULT_STATIC_ROOT.to_string()));

        Self { port, static_root }
    }

    /// Bind address for the listener.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(None, None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.static_root, PathBuf::from(DEFAULT_STATIC_ROOT));
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::from_vars(Some("8080".to_string()), Some("www".to_string()));
        assert_eq!(config.port, 8080);
        assert_eq!(config.static_root, PathBuf::from("www"));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let config = Config::from_vars(Some("not-a-port".to_string()), None);
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
