//! WebSocket gateway: per-connection handle and session loop.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | send queue, liveness state, force-close token |
//! | `session` | upgrade-to-disconnect lifecycle of one client |

pub mod connection;
pub mod session;
