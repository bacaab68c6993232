//! # huddle-store
//!
//! The session store collaborator: a key-value store holding serialized
//! client and room records, keyed by the raw client ID and room code. The
//! presence core only reads it; provisioning and invalidation belong to
//! whoever writes the records.
//!
//! [`SessionStore`] is the interface the core needs (`fetch` a string by
//! key); [`Catalog`] layers typed, JSON-decoding lookups on top. Backends:
//! [`memory::MemoryStore`] for tests/dev, [`redis::RedisStore`] for
//! production.

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod records;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;

use huddle_core::{ClientId, RoomCode};

pub use errors::StoreError;
pub use memory::MemoryStore;
pub use records::{ClientRecord, RoomRecord};
pub use self::redis::RedisStore;

/// Async key-value lookup, the only operation the presence core requires.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the raw value stored under `key`, or `None` when absent.
    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Typed lookups over a [`SessionStore`].
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn SessionStore>,
}

impl Catalog {
    /// Wrap a store backend.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Look up the client record for `client_id`. `None` means the client
    /// is unknown; a present-but-undecodable value is a [`StoreError`].
    pub async fn client_record(
        &self,
        client_id: &ClientId,
    ) -> Result<Option<ClientRecord>, StoreError> {
        match self.store.fetch(client_id.as_str()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Look up the room record for `room_code`.
    pub async fn room_record(
        &self,
        room_code: &RoomCode,
    ) -> Result<Option<RoomRecord>, StoreError> {
        match self.store.fetch(room_code.as_str()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
