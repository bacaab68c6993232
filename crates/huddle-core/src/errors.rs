//! Presence error taxonomy.
//!
//! Every variant maps to "close the connection" at the transport layer; the
//! distinctions exist for logging and metrics, not for the wire. Malformed
//! requests get no error payload at all. Fanout delivery failures are not
//! represented here; they are swallowed at the point of send and the dead
//! peer heals through its own disconnect transition.

use thiserror::Error;

use crate::ids::{ClientId, RoomCode};

/// Reasons a presence transition is refused.
#[derive(Debug, Error)]
pub enum PresenceError {
    /// A required field was missing or empty. The connection is closed
    /// without a response payload.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Credential decrypt or hash comparison failed. The two causes are
    /// deliberately not distinguished.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// No stored record for the client.
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),

    /// The client's room no longer exists in the store.
    #[error("unknown room: {0}")]
    UnknownRoom(RoomCode),

    /// An operation that requires a session was issued by a client with
    /// none (e.g. a score update before validation).
    #[error("no session bound for client {0}")]
    ProtocolMisuse(ClientId),

    /// The session store failed while resolving a record.
    #[error("session store: {0}")]
    Store(String),

    /// A bounded external call (store lookup, credential check) expired.
    /// The registry is left untouched.
    #[error("external call timed out")]
    Timeout,
}

impl PresenceError {
    /// Machine-readable code for structured logs and metric labels.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "MALFORMED_REQUEST",
            Self::AuthenticationFailure => "AUTH_FAILED",
            Self::UnknownClient(_) => "UNKNOWN_CLIENT",
            Self::UnknownRoom(_) => "UNKNOWN_ROOM",
            Self::ProtocolMisuse(_) => "PROTOCOL_MISUSE",
            Self::Store(_) => "STORE_ERROR",
            Self::Timeout => "TIMEOUT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            PresenceError::MalformedRequest("x".into()).code(),
            "MALFORMED_REQUEST"
        );
        assert_eq!(PresenceError::AuthenticationFailure.code(), "AUTH_FAILED");
        assert_eq!(
            PresenceError::UnknownClient(ClientId::from("A")).code(),
            "UNKNOWN_CLIENT"
        );
        assert_eq!(
            PresenceError::UnknownRoom(RoomCode::from("R1")).code(),
            "UNKNOWN_ROOM"
        );
        assert_eq!(
            PresenceError::ProtocolMisuse(ClientId::from("A")).code(),
            "PROTOCOL_MISUSE"
        );
        assert_eq!(PresenceError::Store("io".into()).code(), "STORE_ERROR");
        assert_eq!(PresenceError::Timeout.code(), "TIMEOUT");
    }

    #[test]
    fn display_includes_identity() {
        let err = PresenceError::UnknownClient(ClientId::from("ghost"));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn auth_failure_is_uniform() {
        // One message regardless of which check failed.
        assert_eq!(
            PresenceError::AuthenticationFailure.to_string(),
            "authentication failed"
        );
    }
}
