//! Background eviction of stale inactive sessions.
//!
//! Sessions survive disconnects so clients can rejoin, but nothing in the
//! protocol ever deletes them; without a bound they accumulate for the life
//! of the process. The sweeper drops sessions that have stayed inactive
//! past the configured TTL.

use std::sync::Arc;
use std::time::Duration;

use ::metrics::counter;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::metrics::SESSIONS_EVICTED_TOTAL;
use crate::presence::registry::ConnectionRegistry;

/// Periodically evict sessions inactive for at least `ttl` until cancelled.
pub async fn run_sweeper(
    registry: Arc<ConnectionRegistry>,
    ttl: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    // Skip the immediate first tick
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = registry.evict_inactive(ttl);
                if !evicted.is_empty() {
                    counter!(SESSIONS_EVICTED_TOTAL).increment(evicted.len() as u64);
                    info!(count = evicted.len(), "evicted stale sessions");
                }
            }
            () = cancel.cancelled() => return,
        }
    }
}
