//! Process-wide connection registry.
//!
//! The single source of truth for "who is present": a concurrent map
//! `AppKey → ClientId → Session` plus a reverse index
//! `ConnectionId → (AppKey, ClientId)` maintained atomically alongside the
//! forward map, so a dying connection resolves its owner without scanning
//! every namespace. All operations are lock-scoped in-memory mutations; no
//! external I/O ever runs under the lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use huddle_core::{AppKey, ClientId, ConnectionId, RosterMember};

use crate::ws::connection::ConnectionHandle;

/// One client's presence within a namespace.
#[derive(Clone)]
pub struct Session {
    /// Stable client identity, unique within the namespace.
    pub client_id: ClientId,
    /// Display name, fixed at validation.
    pub username: String,
    /// Display colour, fixed at validation.
    pub colour: String,
    /// Absent until the first score update.
    pub score: Option<i64>,
    /// True while a live connection backs the client.
    pub active: bool,
    /// Monotonic insertion sequence; preserved across re-validation and
    /// rejoin so roster ordering stays stable.
    pub joined_seq: u64,
    /// Stamped on disconnect, cleared on rejoin; drives eviction.
    pub inactive_since: Option<Instant>,
    /// The transport connection exclusively owned by this session.
    pub connection: Arc<ConnectionHandle>,
}

impl Session {
    /// A fresh, active session bound to `connection`. The registry assigns
    /// `joined_seq` on upsert.
    #[must_use]
    pub fn new(
        client_id: ClientId,
        username: String,
        colour: String,
        connection: Arc<ConnectionHandle>,
    ) -> Self {
        Self {
            client_id,
            username,
            colour,
            score: None,
            active: true,
            joined_seq: 0,
            inactive_since: None,
            connection,
        }
    }

    /// Public roster attributes of this session.
    #[must_use]
    pub fn roster_entry(&self) -> RosterMember {
        RosterMember {
            client_id: self.client_id.clone(),
            username: self.username.clone(),
            colour: self.colour.clone(),
            active: self.active,
            score: self.score,
        }
    }
}

/// Lifecycle state of a `(app_key, client_id)` pair, derived from the
/// registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// No session exists.
    Unvalidated,
    /// A live connection backs the session.
    Active,
    /// The session exists but its connection is gone.
    Inactive,
}

#[derive(Default)]
struct RegistryInner {
    namespaces: HashMap<AppKey, HashMap<ClientId, Session>>,
    by_connection: HashMap<ConnectionId, (AppKey, ClientId)>,
    next_seq: u64,
}

/// Concurrent-safe session directory. Owned by the server process and
/// injected into the protocol, never a global.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the session for `(app_key, client_id)`, keeping the
    /// existing insertion sequence on replace and updating the reverse
    /// index. Returns the superseded connection handle (if it differs from
    /// the incoming one) so the caller can force-close it outside the lock.
    pub fn upsert(
        &self,
        app_key: &AppKey,
        client_id: &ClientId,
        mut session: Session,
    ) -> Option<Arc<ConnectionHandle>> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        session.joined_seq = match inner
            .namespaces
            .get(app_key)
            .and_then(|ns| ns.get(client_id))
        {
            Some(existing) => existing.joined_seq,
            None => {
                inner.next_seq += 1;
                inner.next_seq
            }
        };

        let new_connection = session.connection.id.clone();
        let _ = inner
            .by_connection
            .insert(new_connection.clone(), (app_key.clone(), client_id.clone()));

        let previous = inner
            .namespaces
            .entry(app_key.clone())
            .or_default()
            .insert(client_id.clone(), session);

        previous.and_then(|old| {
            if old.connection.id == new_connection {
                None
            } else {
                let _ = inner.by_connection.remove(&old.connection.id);
                Some(old.connection)
            }
        })
    }

    /// Snapshot of one session.
    pub fn get(&self, app_key: &AppKey, client_id: &ClientId) -> Option<Session> {
        self.inner
            .read()
            .namespaces
            .get(app_key)
            .and_then(|ns| ns.get(client_id))
            .cloned()
    }

    /// Lifecycle state of a client within a namespace.
    pub fn state_of(&self, app_key: &AppKey, client_id: &ClientId) -> ClientState {
        match self.get(app_key, client_id) {
            None => ClientState::Unvalidated,
            Some(session) if session.active => ClientState::Active,
            Some(_) => ClientState::Inactive,
        }
    }

    /// Flip a session's active flag, stamping or clearing `inactive_since`.
    /// Returns `false` when no such session exists.
    pub fn set_active(&self, app_key: &AppKey, client_id: &ClientId, active: bool) -> bool {
        let mut inner = self.inner.write();
        match inner
            .namespaces
            .get_mut(app_key)
            .and_then(|ns| ns.get_mut(client_id))
        {
            Some(session) => {
                session.active = active;
                session.inactive_since = if active { None } else { Some(Instant::now()) };
                true
            }
            None => false,
        }
    }

    /// Set a session's score (last-writer-wins). Returns `false` when no
    /// such session exists.
    pub fn set_score(&self, app_key: &AppKey, client_id: &ClientId, score: i64) -> bool {
        let mut inner = self.inner.write();
        match inner
            .namespaces
            .get_mut(app_key)
            .and_then(|ns| ns.get_mut(client_id))
        {
            Some(session) => {
                session.score = Some(score);
                true
            }
            None => false,
        }
    }

    /// Insertion-ordered snapshot of the namespace's active sessions; this
    /// is the roster sent to clients and peers.
    pub fn list_active(&self, app_key: &AppKey) -> Vec<Session> {
        let inner = self.inner.read();
        let mut sessions: Vec<Session> = inner
            .namespaces
            .get(app_key)
            .map(|ns| ns.values().filter(|s| s.active).cloned().collect())
            .unwrap_or_default();
        sessions.sort_by_key(|s| s.joined_seq);
        sessions
    }

    /// Insertion-ordered snapshot of every session in the namespace,
    /// active or not. Fanout iterates this.
    pub fn snapshot(&self, app_key: &AppKey) -> Vec<Session> {
        let inner = self.inner.read();
        let mut sessions: Vec<Session> = inner
            .namespaces
            .get(app_key)
            .map(|ns| ns.values().cloned().collect())
            .unwrap_or_default();
        sessions.sort_by_key(|s| s.joined_seq);
        sessions
    }

    /// Resolve and deactivate the session owning a dying connection, in one
    /// critical section. Returns the owning keys, or `None` when the
    /// connection owns nothing (already superseded, already cleaned up, or
    /// foreign). This makes disconnect idempotent and safe against a racing
    /// re-validation that has already rebound the client to a new handle.
    pub fn remove_by_connection(
        &self,
        connection_id: &ConnectionId,
    ) -> Option<(AppKey, ClientId)> {
        let mut inner = self.inner.write();
        let (app_key, client_id) = inner.by_connection.remove(connection_id)?;
        let session = inner
            .namespaces
            .get_mut(&app_key)
            .and_then(|ns| ns.get_mut(&client_id))?;
        if session.connection.id != *connection_id {
            return None;
        }
        session.active = false;
        session.inactive_since = Some(Instant::now());
        Some((app_key, client_id))
    }

    /// Drop sessions that have been inactive for at least `ttl`, pruning
    /// emptied namespaces. Returns the evicted keys.
    pub fn evict_inactive(&self, ttl: Duration) -> Vec<(AppKey, ClientId)> {
        let mut evicted = Vec::new();
        let mut inner = self.inner.write();
        let RegistryInner {
            namespaces,
            by_connection,
            ..
        } = &mut *inner;
        namespaces.retain(|app_key, ns| {
            ns.retain(|client_id, session| {
                let stale = !session.active
                    && session
                        .inactive_since
                        .is_some_and(|since| since.elapsed() >= ttl);
                if stale {
                    let _ = by_connection.remove(&session.connection.id);
                    evicted.push((app_key.clone(), client_id.clone()));
                }
                !stale
            });
            !ns.is_empty()
        });
        evicted
    }

    /// Total sessions across all namespaces (active and inactive).
    pub fn session_count(&self) -> usize {
        self.inner
            .read()
            .namespaces
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Active sessions across all namespaces.
    pub fn active_count(&self) -> usize {
        self.inner
            .read()
            .namespaces
            .values()
            .flat_map(HashMap::values)
            .filter(|s| s.active)
            .count()
    }
}
