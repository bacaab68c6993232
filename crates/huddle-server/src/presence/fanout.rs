//! Event fan-out to a namespace's connections.

use std::sync::Arc;

use ::metrics::counter;
use tracing::{debug, warn};

use huddle_core::{AppKey, ClientId, ServerEvent};

use crate::metrics::{BROADCAST_DROPS_TOTAL, BROADCAST_EVENTS_TOTAL};
use crate::presence::registry::ConnectionRegistry;

/// Deliver `event` to every session in the namespace except
/// `exclude_client_id` (or to all of them when `include_excluded`).
///
/// The event is serialized once and shared; the registry is read only long
/// enough to snapshot the namespace, and every send is a non-blocking
/// `try_send` outside the lock. Delivery failures are counted and swallowed;
/// a dead peer triggers its own disconnect transition.
pub fn broadcast(
    registry: &ConnectionRegistry,
    app_key: &AppKey,
    event: &ServerEvent,
    exclude_client_id: Option<&ClientId>,
    include_excluded: bool,
) {
    let wire = match event.to_wire() {
        Ok(wire) => Arc::new(wire),
        Err(err) => {
            warn!(event = %event.name(), error = %err, "failed to serialize broadcast event");
            return;
        }
    };

    let snapshot = registry.snapshot(app_key);
    let mut recipients = 0u32;
    for session in &snapshot {
        if !include_excluded && exclude_client_id == Some(&session.client_id) {
            continue;
        }
        if session.connection.send(Arc::clone(&wire)) {
            recipients += 1;
        } else {
            counter!(BROADCAST_DROPS_TOTAL).increment(1);
            debug!(
                client_id = %session.client_id,
                event = %event.name(),
                "peer delivery failed (dropped)"
            );
        }
    }
    counter!(BROADCAST_EVENTS_TOTAL, "event" => event.name()).increment(1);
    debug!(app_key = %app_key, event = %event.name(), recipients, "broadcast");
}
