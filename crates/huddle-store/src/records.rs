//! Typed shapes of the values held in the session store.
//!
//! The store is keyed by the raw client ID and room code strings. Both
//! record kinds carry an Argon2 PHC hash of the room secret: the room's
//! copy is authoritative for provisioning, the client's copy is what the
//! presence handshake verifies against. The presence core never writes
//! either record.

use serde::{Deserialize, Serialize};

use huddle_core::{AppKey, RoomCode};

/// Value stored under a client ID: the join between a client and its room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    /// Room this client belongs to.
    pub room_code: RoomCode,
    /// Argon2 PHC hash of the room secret.
    pub secret: String,
}

/// Value stored under a room code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    /// Human-readable room name, echoed back in handshake replies.
    pub name: String,
    /// Namespace the room's presence state lives under. Authoritative over
    /// whatever namespace a caller claims.
    pub app_key: AppKey,
    /// Argon2 PHC hash of the room secret.
    pub secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_record_wire_shape() {
        let json = r#"{"roomCode":"R1","secret":"$argon2id$v=19$..."}"#;
        let record: ClientRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.room_code, RoomCode::from("R1"));
        assert!(record.secret.starts_with("$argon2id$"));
    }

    #[test]
    fn room_record_wire_shape() {
        let json = r#"{"name":"Quiz Night","appKey":"k1","secret":"h"}"#;
        let record: RoomRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "Quiz Night");
        assert_eq!(record.app_key, AppKey::from("k1"));
    }

    #[test]
    fn records_roundtrip_camel_case() {
        let record = RoomRecord {
            name: "R".into(),
            app_key: AppKey::from("k"),
            secret: "s".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("appKey").is_some());
        assert!(json.get("app_key").is_none());
    }

    #[test]
    fn missing_field_is_an_error() {
        assert!(serde_json::from_str::<RoomRecord>(r#"{"name":"R"}"#).is_err());
    }
}
