//! # huddle-core
//!
//! Shared types for the Huddle presence service:
//!
//! - Branded ID newtypes ([`AppKey`], [`ClientId`], [`RoomCode`],
//!   [`ConnectionId`])
//! - Wire events: tagged inbound [`ClientEvent`] and outbound [`ServerEvent`]
//! - The roster entry shape sent to clients ([`RosterMember`])
//! - The presence error taxonomy ([`PresenceError`])

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod ids;

pub use errors::PresenceError;
pub use events::{ClientEvent, RejoinRequest, RosterMember, ScoreRequest, ServerEvent, ValidateRequest};
pub use ids::{AppKey, ClientId, ConnectionId, RoomCode};
