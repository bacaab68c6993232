//! In-memory store backend for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use huddle_core::{ClientId, RoomCode};

use crate::errors::StoreError;
use crate::records::{ClientRecord, RoomRecord};
use crate::SessionStore;

/// HashMap-backed [`SessionStore`]. The `put_*` helpers exist so tests and
/// local runs can provision records without a Redis instance.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value under a key.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.entries.write().insert(key.into(), value.into());
    }

    /// Provision a client record under its client ID.
    pub fn put_client(&self, client_id: &ClientId, record: &ClientRecord) {
        let value = serde_json::to_string(record).unwrap_or_default();
        self.put(client_id.as_str(), value);
    }

    /// Provision a room record under its room code.
    pub fn put_room(&self, room_code: &RoomCode, record: &RoomRecord) {
        let value = serde_json::to_string(record).unwrap_or_default();
        self.put(room_code.as_str(), value);
    }

    /// Drop a key (simulates expiry).
    pub fn remove(&self, key: &str) {
        let _ = self.entries.write().remove(key);
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_absent_key() {
        let store = MemoryStore::new();
        assert_eq!(store.fetch("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn fetch_present_key() {
        let store = MemoryStore::new();
        store.put("k", "v");
        assert_eq!(store.fetch("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn remove_simulates_expiry() {
        let store = MemoryStore::new();
        store.put("k", "v");
        store.remove("k");
        assert_eq!(store.fetch("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_client_stores_under_raw_id() {
        let store = MemoryStore::new();
        let id = ClientId::from("A");
        store.put_client(
            &id,
            &ClientRecord {
                room_code: RoomCode::from("R1"),
                secret: "h".into(),
            },
        );
        let raw = store.fetch("A").await.unwrap().unwrap();
        assert!(raw.contains("\"roomCode\":\"R1\""));
    }
}
