//! Server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the Huddle server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Heartbeat ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close clients silent for longer than this many seconds.
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Bound on store lookups + credential checks during a handshake.
    pub auth_timeout_secs: u64,
    /// Evict sessions that have been inactive for this many seconds.
    pub inactive_ttl_secs: u64,
    /// How often the eviction sweeper runs.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
            auth_timeout_secs: 5,
            inactive_ttl_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}
