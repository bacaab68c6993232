//! Redis store backend.
//!
//! Uses a [`ConnectionManager`] so transient connection loss reconnects
//! transparently; individual lookups during an outage surface as
//! [`StoreError::Redis`] and close only the affected client's handshake.

use ::redis::AsyncCommands;
use ::redis::aio::ConnectionManager;
use async_trait::async_trait;
use tracing::info;

use crate::SessionStore;
use crate::errors::StoreError;

/// Redis-backed [`SessionStore`].
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis instance at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        info!(url, "connected to session store");
        Ok(Self { manager })
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }
}
