//! Presence protocol state machine.
//!
//! Dispatches validate / rejoin / score / disconnect events against the
//! registry. Both handshakes run through one [`authenticate`] primitive with
//! one failure policy (the connection is closed), and every handler consults
//! the [`admit`] transition table before mutating, so the reachable
//! transitions are enumerable and tested rather than implied by control
//! flow. External calls (store lookups, credential checks) happen before any
//! registry mutation and are bounded by a timeout; on expiry the registry is
//! left untouched.

use std::sync::Arc;
use std::time::Duration;

use ::metrics::{counter, gauge};
use tracing::{debug, info, instrument};

use huddle_auth::CredentialVerifier;
use huddle_core::{
    AppKey, ClientEvent, ClientId, ConnectionId, PresenceError, RejoinRequest, RosterMember,
    ScoreRequest, ServerEvent, ValidateRequest,
};
use huddle_store::{Catalog, ClientRecord, RoomRecord};

use crate::metrics::{
    REJOINS_TOTAL, SCORE_UPDATES_TOTAL, SESSIONS_ACTIVE, SUPERSEDED_CONNECTIONS_TOTAL,
    VALIDATIONS_TOTAL,
};
use crate::presence::fanout;
use crate::presence::registry::{ClientState, ConnectionRegistry, Session};
use crate::ws::connection::ConnectionHandle;

/// Protocol event classes, for the transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Initial credential handshake.
    Validate,
    /// Reconnect handshake.
    Rejoin,
    /// Score update.
    Score,
    /// Transport-level disconnect.
    Disconnect,
}

/// What the transition table decides for a `(state, event)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The handler may mutate the registry.
    Proceed,
    /// Rejoin from a client with no session: signal fallback to validate.
    Revalidate,
    /// Protocol misuse; the connection is closed.
    Refuse,
    /// Harmless no-op (e.g. disconnect of an unowned handle).
    Ignore,
}

/// The complete transition table. Every `(state, event)` pair is enumerated
/// here; handlers never mutate without consulting it.
#[must_use]
pub fn admit(state: ClientState, event: EventKind) -> Admission {
    match (state, event) {
        // Validation creates or supersedes a session from any state.
        (_, EventKind::Validate) => Admission::Proceed,
        // Rejoin restores an existing session; without one the client is
        // told to fall back to validate instead of crashing the handler.
        (ClientState::Unvalidated, EventKind::Rejoin) => Admission::Revalidate,
        (ClientState::Active | ClientState::Inactive, EventKind::Rejoin) => Admission::Proceed,
        // Score updates require a session, whatever its active flag.
        (ClientState::Unvalidated, EventKind::Score) => Admission::Refuse,
        (ClientState::Active | ClientState::Inactive, EventKind::Score) => Admission::Proceed,
        // Disconnect only transitions a live session; anything else was
        // already cleaned up or superseded.
        (ClientState::Active, EventKind::Disconnect) => Admission::Proceed,
        (ClientState::Unvalidated | ClientState::Inactive, EventKind::Disconnect) => {
            Admission::Ignore
        }
    }
}

/// The presence state machine, shared by all connection tasks.
pub struct PresenceProtocol {
    registry: Arc<ConnectionRegistry>,
    catalog: Catalog,
    verifier: Arc<CredentialVerifier>,
    auth_timeout: Duration,
}

impl PresenceProtocol {
    /// Wire the protocol to its collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        catalog: Catalog,
        verifier: Arc<CredentialVerifier>,
        auth_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            catalog,
            verifier,
            auth_timeout,
        }
    }

    /// The registry this protocol mutates.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Dispatch one inbound event. An `Err` means the caller's connection
    /// must be closed; no error payload is sent.
    pub async fn handle_event(
        &self,
        connection: &Arc<ConnectionHandle>,
        event: ClientEvent,
    ) -> Result<(), PresenceError> {
        match event {
            ClientEvent::Validate(req) => self.validate(connection, req).await,
            ClientEvent::Rejoin(req) => self.rejoin(connection, req).await,
            ClientEvent::IncrementScore(req) => self.update_score(connection, req).await,
        }
    }

    /// Initial handshake: authenticate, bind the session, emit the roster to
    /// the caller, and announce the join to peers.
    #[instrument(skip_all, fields(client_id = %req.client_id))]
    async fn validate(
        &self,
        connection: &Arc<ConnectionHandle>,
        req: ValidateRequest,
    ) -> Result<(), PresenceError> {
        require("clientId", req.client_id.as_str())?;
        require("appKey", req.app_key.as_str())?;
        require("clientSecret", &req.client_secret)?;
        require("username", &req.username)?;
        require("colour", &req.colour)?;

        let (_, room) = self.authenticate(&req.client_id, &req.client_secret).await?;
        // The stored room decides the namespace; a spoofed appKey in the
        // request cannot plant a session elsewhere.
        let app_key = room.app_key;
        if app_key != req.app_key {
            debug!(claimed = %req.app_key, actual = %app_key, "caller-supplied app key ignored");
        }

        let session = Session::new(
            req.client_id.clone(),
            req.username,
            req.colour,
            Arc::clone(connection),
        );
        self.bind(&app_key, &req.client_id, session);

        let members = self.roster(&app_key);
        let reply = ServerEvent::Validation {
            client_id: req.client_id.clone(),
            room_name: room.name,
            members: members.clone(),
        };
        if !connection.send_event(&reply) {
            debug!("failed to enqueue validation reply");
        }
        fanout::broadcast(
            &self.registry,
            &app_key,
            &ServerEvent::UserJoined { members },
            Some(&req.client_id),
            false,
        );
        counter!(VALIDATIONS_TOTAL).increment(1);
        info!(app_key = %app_key, "client validated");
        Ok(())
    }

    /// Reconnect handshake: authenticate, then either restore the session
    /// (new handle, `active = true`) or tell the client to revalidate.
    #[instrument(skip_all, fields(client_id = %req.client_id))]
    async fn rejoin(
        &self,
        connection: &Arc<ConnectionHandle>,
        req: RejoinRequest,
    ) -> Result<(), PresenceError> {
        require("clientId", req.client_id.as_str())?;
        require("appKey", req.app_key.as_str())?;
        require("clientSecret", &req.client_secret)?;

        let (_, room) = self.authenticate(&req.client_id, &req.client_secret).await?;
        let app_key = room.app_key;

        let existing = self.registry.get(&app_key, &req.client_id);
        let state = match &existing {
            None => ClientState::Unvalidated,
            Some(session) if session.active => ClientState::Active,
            Some(_) => ClientState::Inactive,
        };
        match admit(state, EventKind::Rejoin) {
            Admission::Revalidate => {
                let _ = connection.send_event(&ServerEvent::Revalidate {
                    client_id: req.client_id.clone(),
                });
                debug!("no session to rejoin; client asked to revalidate");
                Ok(())
            }
            Admission::Proceed => {
                let existing =
                    existing.ok_or_else(|| PresenceError::ProtocolMisuse(req.client_id.clone()))?;
                let your_score = existing.score;
                let session = Session {
                    active: true,
                    inactive_since: None,
                    connection: Arc::clone(connection),
                    ..existing
                };
                self.bind(&app_key, &req.client_id, session);

                let members = self.roster(&app_key);
                let reply = ServerEvent::Rejoin {
                    client_id: req.client_id.clone(),
                    room_name: room.name,
                    members: members.clone(),
                    your_score,
                };
                if !connection.send_event(&reply) {
                    debug!("failed to enqueue rejoin reply");
                }
                fanout::broadcast(
                    &self.registry,
                    &app_key,
                    &ServerEvent::UserJoined { members },
                    Some(&req.client_id),
                    false,
                );
                counter!(REJOINS_TOTAL).increment(1);
                info!(app_key = %app_key, "client rejoined");
                Ok(())
            }
            Admission::Refuse | Admission::Ignore => {
                Err(PresenceError::ProtocolMisuse(req.client_id.clone()))
            }
        }
    }

    /// Absolute score update against an existing session.
    #[instrument(skip_all, fields(client_id = %req.client_id))]
    async fn update_score(
        &self,
        connection: &Arc<ConnectionHandle>,
        req: ScoreRequest,
    ) -> Result<(), PresenceError> {
        require("clientId", req.client_id.as_str())?;
        require("appKey", req.app_key.as_str())?;

        let state = self.registry.state_of(&req.app_key, &req.client_id);
        match admit(state, EventKind::Score) {
            Admission::Proceed => {}
            _ => return Err(PresenceError::ProtocolMisuse(req.client_id.clone())),
        }
        if !self.registry.set_score(&req.app_key, &req.client_id, req.score) {
            return Err(PresenceError::ProtocolMisuse(req.client_id.clone()));
        }

        let members = self.roster(&req.app_key);
        let event = ServerEvent::ScoreUpdated { members };
        if !connection.send_event(&event) {
            debug!("failed to enqueue score reply");
        }
        fanout::broadcast(&self.registry, &req.app_key, &event, Some(&req.client_id), false);
        counter!(SCORE_UPDATES_TOTAL).increment(1);
        debug!(score = req.score, "score updated");
        Ok(())
    }

    /// Transport-level disconnect. Resolves the owning session via the
    /// reverse index; unowned handles (superseded, double disconnect,
    /// foreign) are a no-op. Never an error.
    pub fn disconnect(&self, connection_id: &ConnectionId) {
        let Some((app_key, client_id)) = self.registry.remove_by_connection(connection_id) else {
            return;
        };
        gauge!(SESSIONS_ACTIVE).set(self.registry.active_count() as f64);
        let members = self.roster(&app_key);
        fanout::broadcast(
            &self.registry,
            &app_key,
            &ServerEvent::UserLeft { members },
            Some(&client_id),
            false,
        );
        info!(app_key = %app_key, client_id = %client_id, "client left");
    }

    /// One authentication primitive for both handshakes: resolve the client
    /// record, verify the credential, resolve the room. Bounded by the auth
    /// timeout; nothing here touches the registry.
    async fn authenticate(
        &self,
        client_id: &ClientId,
        encrypted_secret: &str,
    ) -> Result<(ClientRecord, RoomRecord), PresenceError> {
        let lookup = async {
            let client = self
                .catalog
                .client_record(client_id)
                .await
                .map_err(|e| PresenceError::Store(e.to_string()))?
                .ok_or_else(|| PresenceError::UnknownClient(client_id.clone()))?;

            if !self
                .verifier
                .verify_offloaded(encrypted_secret.to_owned(), client.secret.clone())
                .await
            {
                return Err(PresenceError::AuthenticationFailure);
            }

            let room = self
                .catalog
                .room_record(&client.room_code)
                .await
                .map_err(|e| PresenceError::Store(e.to_string()))?
                .ok_or_else(|| PresenceError::UnknownRoom(client.room_code.clone()))?;
            Ok((client, room))
        };
        tokio::time::timeout(self.auth_timeout, lookup)
            .await
            .map_err(|_| PresenceError::Timeout)?
    }

    /// Upsert a session, force-closing any superseded handle outside the
    /// registry lock.
    fn bind(&self, app_key: &AppKey, client_id: &ClientId, session: Session) {
        if let Some(superseded) = self.registry.upsert(app_key, client_id, session) {
            counter!(SUPERSEDED_CONNECTIONS_TOTAL).increment(1);
            debug!(connection_id = %superseded.id, "force-closing superseded connection");
            superseded.close();
        }
        gauge!(SESSIONS_ACTIVE).set(self.registry.active_count() as f64);
    }

    /// Current active roster of a namespace.
    fn roster(&self, app_key: &AppKey) -> Vec<RosterMember> {
        self.registry
            .list_active(app_key)
            .iter()
            .map(Session::roster_entry)
            .collect()
    }
}

fn require(field: &'static str, value: &str) -> Result<(), PresenceError> {
    if value.is_empty() {
        Err(PresenceError::MalformedRequest(format!(
            "missing required field: {field}"
        )))
    } else {
        Ok(())
    }
}
