//! Tile38 server access.
//!
//! ServerConfig::resolve -> { host, port, password }
//! Transport: the capability set the dispatcher needs (raw command, set, delete, close).
//! Tile38Client: RESP-over-TCP implementation of Transport (see client.rs / resp.rs).
//! QueryResult: typed reply payloads (see payload.rs).
//!
use thiserror::Error;
use url::Url;

use crate::cmd::coords::Coordinate;

pub mod client;
pub mod payload;
pub mod resp;

pub use client::Tile38Client;
pub use payload::{ObjectRecord, QueryResult, ResultKind, StatsRecord};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9851;

/// Anything that can go wrong between sending a command and holding its reply.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// Error text reported by the server itself.
    #[error("{0}")]
    Server(String),

    #[error("unexpected reply payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("connection already closed")]
    Closed,
}

/// Request/response access to a Tile38 server.
///
/// Each method sends one command and returns the JSON text of the reply.
/// `close` must be called exactly once when the caller is done.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send_command(&mut self, name: &str, args: &[String])
    -> Result<String, TransportError>;

    /// Upsert a point object at (`key`, `id`).
    async fn set_point(
        &mut self,
        key: &str,
        id: &str,
        point: &Coordinate,
    ) -> Result<String, TransportError>;

    /// Remove one object when `id` is given, otherwise drop the whole key.
    async fn delete(&mut self, key: &str, id: Option<&str>) -> Result<String, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: None,
        }
    }
}

impl ServerConfig {
    /// Build from the `--host` / `--auth` values (already merged with the
    /// `TILE38_HOST` / `TILE38_AUTH` environment by clap).
    ///
    /// An explicit `auth` wins over a password embedded in the address URL.
    pub fn resolve(host: Option<&str>, auth: Option<&str>) -> Result<Self, String> {
        let mut config = match host.map(str::trim).filter(|h| !h.is_empty()) {
            Some(raw) => parse_address(raw)?,
            None => ServerConfig::default(),
        };
        if let Some(pw) = auth.filter(|a| !a.is_empty()) {
            config.password = Some(pw.to_string());
        }
        Ok(config)
    }

    /// `host:port` form for messages.
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Parse a server address.
///
/// Accepted forms:
/// - "localhost"                       -> localhost:9851
/// - "10.0.0.5:9852"
/// - "[::1]:9851"
/// - "tile38://:secret@db.internal:9851" (also `redis://`, `tcp://`)
pub fn parse_address(raw: &str) -> Result<ServerConfig, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("address is empty".into());
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("tile38://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|e| e.to_string())?;

    match url.scheme() {
        "tile38" | "redis" | "tcp" => {}
        other => return Err(format!("unsupported scheme '{other}'")),
    }

    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
        .filter(|h| !h.is_empty())
        .ok_or_else(|| "missing host".to_string())?;

    Ok(ServerConfig {
        host: host.to_string(),
        port: url.port().unwrap_or(DEFAULT_PORT),
        password: url.password().map(str::to_string),
    })
}
