//! # huddle-server
//!
//! Axum HTTP + `WebSocket` presence server.
//!
//! - HTTP surface: two liveness endpoints (`/`, `/health`) and the `/ws`
//!   upgrade, nothing else
//! - Presence core: connection registry, protocol state machine, broadcast
//!   fanout
//! - One task per connection; heartbeat pings; graceful shutdown via
//!   `CancellationToken`
//! - Background sweeper evicting long-inactive sessions

#![deny(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod presence;
pub mod server;
pub mod sweeper;
pub mod ws;
