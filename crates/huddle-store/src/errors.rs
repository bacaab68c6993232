//! Store error types.

use thiserror::Error;

/// Errors from session store lookups.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The Redis backend failed (connection, protocol, or command error).
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored value was present but not a valid record.
    #[error("decode stored record: {0}")]
    Decode(#[from] serde_json::Error),
}
