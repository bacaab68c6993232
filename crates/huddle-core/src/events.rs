//! Wire events for the presence protocol.
//!
//! Inbound frames are a tagged enum: `{"event": "...", "data": {...}}` with
//! one variant per event name and a fixed payload shape, rejected at the
//! boundary when malformed. Outbound events carry the same envelope; some
//! event names are suffixed with the addressed client's ID
//! (`validation-<clientId>`, `rejoin-<clientId>`, `revalidate-<clientId>`),
//! so serialization goes through [`ServerEvent::to_wire`] rather than a
//! derived tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{AppKey, ClientId};

/// One entry of the roster sent to clients. Filtered to active sessions and
/// ordered by insertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    /// Stable client identity.
    pub client_id: ClientId,
    /// Display name supplied at validation.
    pub username: String,
    /// Display colour supplied at validation.
    pub colour: String,
    /// Always `true` in emitted rosters; carried for wire compatibility.
    pub active: bool,
    /// Current score; absent until the first score update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

/// `validate` payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    /// Client identity to validate.
    pub client_id: ClientId,
    /// Caller-supplied namespace; the stored room's key is authoritative.
    pub app_key: AppKey,
    /// Encrypted client secret (base64 nonce || ciphertext).
    pub client_secret: String,
    /// Display name, fixed for the session's lifetime.
    pub username: String,
    /// Display colour, fixed for the session's lifetime.
    pub colour: String,
}

/// `rejoin` payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejoinRequest {
    /// Client identity to restore.
    pub client_id: ClientId,
    /// Caller-supplied namespace; the stored room's key is authoritative.
    pub app_key: AppKey,
    /// Encrypted client secret (base64 nonce || ciphertext).
    pub client_secret: String,
}

/// `increment-score` payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    /// Client whose score is being set.
    pub client_id: ClientId,
    /// Namespace the client's session lives in.
    pub app_key: AppKey,
    /// New absolute score (last-writer-wins).
    pub score: i64,
}

/// Inbound events, one variant per wire event name.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Initial credential handshake.
    Validate(ValidateRequest),
    /// Reconnect handshake restoring an existing session.
    Rejoin(RejoinRequest),
    /// Absolute score update.
    IncrementScore(ScoreRequest),
}

/// Outbound events emitted to a single caller or fanned out to a namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerEvent {
    /// Greeting sent on connect, before any handshake.
    Welcome,
    /// Reply to a successful `validate`.
    Validation {
        /// Addressed client (suffixes the event name).
        client_id: ClientId,
        /// Human-readable room name from the stored room record.
        room_name: String,
        /// Active roster including the caller.
        members: Vec<RosterMember>,
    },
    /// Reply to a successful `rejoin`.
    Rejoin {
        /// Addressed client (suffixes the event name).
        client_id: ClientId,
        /// Human-readable room name from the stored room record.
        room_name: String,
        /// Active roster including the caller.
        members: Vec<RosterMember>,
        /// The caller's score as restored from its session.
        your_score: Option<i64>,
    },
    /// Instructs a rejoining client with no session to fall back to `validate`.
    Revalidate {
        /// Addressed client (suffixes the event name).
        client_id: ClientId,
    },
    /// A peer entered the namespace (validate or rejoin).
    UserJoined {
        /// Active roster after the join.
        members: Vec<RosterMember>,
    },
    /// A peer's score changed.
    ScoreUpdated {
        /// Active roster carrying the new score.
        members: Vec<RosterMember>,
    },
    /// A peer disconnected.
    UserLeft {
        /// Active roster after the departure.
        members: Vec<RosterMember>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RosterPayload<'a> {
    current_members: &'a [RosterMember],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationPayload<'a> {
    current_members: &'a [RosterMember],
    room_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RejoinPayload<'a> {
    room_name: &'a str,
    current_members: &'a [RosterMember],
    your_score: Option<i64>,
}

impl ServerEvent {
    /// Wire event name. Handshake replies are addressed by suffixing the
    /// client ID so a client can listen for its own reply only.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Welcome => "welcome".to_owned(),
            Self::Validation { client_id, .. } => format!("validation-{client_id}"),
            Self::Rejoin { client_id, .. } => format!("rejoin-{client_id}"),
            Self::Revalidate { client_id } => format!("revalidate-{client_id}"),
            Self::UserJoined { .. } => "user-joined".to_owned(),
            Self::ScoreUpdated { .. } => "score-updated".to_owned(),
            Self::UserLeft { .. } => "user-left".to_owned(),
        }
    }

    fn payload(&self) -> serde_json::Result<Value> {
        match self {
            Self::Welcome => Ok(Value::String("Please validate.".to_owned())),
            Self::Validation {
                room_name, members, ..
            } => serde_json::to_value(ValidationPayload {
                current_members: members,
                room_name,
            }),
            Self::Rejoin {
                room_name,
                members,
                your_score,
                ..
            } => serde_json::to_value(RejoinPayload {
                room_name,
                current_members: members,
                your_score: *your_score,
            }),
            Self::Revalidate { .. } => Ok(Value::Null),
            Self::UserJoined { members }
            | Self::ScoreUpdated { members }
            | Self::UserLeft { members } => serde_json::to_value(RosterPayload {
                current_members: members,
            }),
        }
    }

    /// Serialize to the wire envelope `{"event": name, "data": payload}`.
    pub fn to_wire(&self) -> serde_json::Result<String> {
        let envelope = serde_json::json!({
            "event": self.name(),
            "data": self.payload()?,
        });
        serde_json::to_string(&envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, score: Option<i64>) -> RosterMember {
        RosterMember {
            client_id: ClientId::from(id),
            username: format!("user-{id}"),
            colour: "teal".to_owned(),
            active: true,
            score,
        }
    }

    #[test]
    fn validate_event_parses() {
        let raw = r#"{
            "event": "validate",
            "data": {
                "clientId": "A",
                "appKey": "k1",
                "clientSecret": "c2VjcmV0",
                "username": "alice",
                "colour": "teal"
            }
        }"#;
        let event: ClientEvent = serde_json::from_str(raw).unwrap();
        match event {
            ClientEvent::Validate(req) => {
                assert_eq!(req.client_id, ClientId::from("A"));
                assert_eq!(req.app_key, AppKey::from("k1"));
                assert_eq!(req.username, "alice");
                assert_eq!(req.colour, "teal");
            }
            other => panic!("expected validate, got {other:?}"),
        }
    }

    #[test]
    fn rejoin_event_parses() {
        let raw = r#"{"event":"rejoin","data":{"clientId":"A","appKey":"k1","clientSecret":"x"}}"#;
        let event: ClientEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event, ClientEvent::Rejoin(_)));
    }

    #[test]
    fn increment_score_event_parses() {
        let raw =
            r#"{"event":"increment-score","data":{"clientId":"A","appKey":"k1","score":42}}"#;
        let event: ClientEvent = serde_json::from_str(raw).unwrap();
        match event {
            ClientEvent::IncrementScore(req) => assert_eq!(req.score, 42),
            other => panic!("expected increment-score, got {other:?}"),
        }
    }

    #[test]
    fn missing_field_is_rejected() {
        // No username
        let raw = r#"{
            "event": "validate",
            "data": {"clientId": "A", "appKey": "k1", "clientSecret": "x", "colour": "teal"}
        }"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        let raw = r#"{"event":"shout","data":{}}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn non_object_frame_is_rejected() {
        assert!(serde_json::from_str::<ClientEvent>("[1,2,3]").is_err());
        assert!(serde_json::from_str::<ClientEvent>("\"validate\"").is_err());
    }

    #[test]
    fn roster_member_omits_unset_score() {
        let json = serde_json::to_value(member("A", None)).unwrap();
        assert!(json.get("score").is_none());
        assert_eq!(json["clientId"], "A");
        assert_eq!(json["active"], true);
    }

    #[test]
    fn roster_member_serializes_score() {
        let json = serde_json::to_value(member("A", Some(7))).unwrap();
        assert_eq!(json["score"], 7);
    }

    #[test]
    fn roster_member_keys_are_camel_case() {
        let json = serde_json::to_value(member("A", Some(1))).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("clientId"));
        assert!(obj.contains_key("username"));
        assert!(obj.contains_key("colour"));
        assert!(obj.contains_key("active"));
    }

    #[test]
    fn validation_event_name_is_suffixed() {
        let event = ServerEvent::Validation {
            client_id: ClientId::from("A"),
            room_name: "R1".to_owned(),
            members: vec![],
        };
        assert_eq!(event.name(), "validation-A");
    }

    #[test]
    fn validation_wire_payload() {
        let event = ServerEvent::Validation {
            client_id: ClientId::from("A"),
            room_name: "R1".to_owned(),
            members: vec![member("A", None)],
        };
        let wire: Value = serde_json::from_str(&event.to_wire().unwrap()).unwrap();
        assert_eq!(wire["event"], "validation-A");
        assert_eq!(wire["data"]["roomName"], "R1");
        assert_eq!(wire["data"]["currentMembers"][0]["clientId"], "A");
    }

    #[test]
    fn rejoin_wire_carries_your_score() {
        let event = ServerEvent::Rejoin {
            client_id: ClientId::from("B"),
            room_name: "R1".to_owned(),
            members: vec![member("B", Some(7))],
            your_score: Some(7),
        };
        let wire: Value = serde_json::from_str(&event.to_wire().unwrap()).unwrap();
        assert_eq!(wire["event"], "rejoin-B");
        assert_eq!(wire["data"]["yourScore"], 7);
    }

    #[test]
    fn rejoin_wire_your_score_null_when_unset() {
        let event = ServerEvent::Rejoin {
            client_id: ClientId::from("B"),
            room_name: "R1".to_owned(),
            members: vec![],
            your_score: None,
        };
        let wire: Value = serde_json::from_str(&event.to_wire().unwrap()).unwrap();
        assert!(wire["data"]["yourScore"].is_null());
    }

    #[test]
    fn revalidate_wire_has_null_data() {
        let event = ServerEvent::Revalidate {
            client_id: ClientId::from("C"),
        };
        let wire: Value = serde_json::from_str(&event.to_wire().unwrap()).unwrap();
        assert_eq!(wire["event"], "revalidate-C");
        assert!(wire["data"].is_null());
    }

    #[test]
    fn welcome_wire() {
        let wire: Value = serde_json::from_str(&ServerEvent::Welcome.to_wire().unwrap()).unwrap();
        assert_eq!(wire["event"], "welcome");
        assert_eq!(wire["data"], "Please validate.");
    }

    #[test]
    fn fanout_event_names() {
        let members = vec![member("A", None)];
        assert_eq!(
            ServerEvent::UserJoined {
                members: members.clone()
            }
            .name(),
            "user-joined"
        );
        assert_eq!(
            ServerEvent::ScoreUpdated {
                members: members.clone()
            }
            .name(),
            "score-updated"
        );
        assert_eq!(ServerEvent::UserLeft { members }.name(), "user-left");
    }
}
