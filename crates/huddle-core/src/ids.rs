//! Branded ID newtypes for type safety.
//!
//! Every identity in the presence model has a distinct newtype around
//! `String`, so an application key can never be passed where a client ID is
//! expected. Client IDs, app keys, and room codes are minted by the
//! provisioning layer and arrive over the wire; connection IDs are generated
//! server-side as UUID v7 (time-ordered).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Application namespace key. All presence state is partitioned under it;
    /// there is no cross-namespace visibility.
    AppKey
}

branded_id! {
    /// Stable client identity within a namespace. Survives reconnects.
    ClientId
}

branded_id! {
    /// Room code joining a client to its room metadata in the session store.
    RoomCode
}

branded_id! {
    /// Server-generated identity of one transport connection.
    ConnectionId
}

impl ConnectionId {
    /// Mint a fresh connection ID (UUID v7, time-ordered).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_inner() {
        let key = AppKey::from("k1");
        assert_eq!(key.to_string(), "k1");
        assert_eq!(key.as_str(), "k1");
    }

    #[test]
    fn distinct_types_compare_by_value() {
        assert_eq!(ClientId::from("a"), ClientId::from("a"));
        assert_ne!(ClientId::from("a"), ClientId::from("b"));
    }

    #[test]
    fn serde_is_transparent() {
        let id = ClientId::from("client-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"client-7\"");
        let back: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn empty_detection() {
        assert!(RoomCode::from("").is_empty());
        assert!(!RoomCode::from("R1").is_empty());
    }

    #[test]
    fn generated_connection_ids_are_unique() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn roundtrip_through_string() {
        let code = RoomCode::from(String::from("R1"));
        let s: String = code.clone().into();
        assert_eq!(RoomCode::from(s), code);
    }
}
