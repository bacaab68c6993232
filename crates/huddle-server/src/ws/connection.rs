//! Per-client connection handle.
//!
//! A [`ConnectionHandle`] is the session's exclusively-owned grip on one
//! transport connection: a bounded send queue feeding the socket's write
//! task, liveness state for the heartbeat, and a cancellation token that
//! force-closes the socket when the handle is superseded by a newer one for
//! the same client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use huddle_core::{ConnectionId, ServerEvent};

/// One live (or superseded) transport connection.
pub struct ConnectionHandle {
    /// Unique connection identity; key of the registry's reverse index.
    pub id: ConnectionId,
    /// Send channel to the connection's socket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded since the last ping.
    pub is_alive: AtomicBool,
    /// When the last pong (or any activity) was received.
    last_pong: Mutex<Instant>,
    /// Count of messages dropped due to a full or closed channel.
    dropped_messages: AtomicU64,
    /// Cancelled when the handle is superseded or the server closes it.
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle over a send channel.
    #[must_use]
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    /// Enqueue a serialized frame. Returns `false` (and counts the drop)
    /// when the queue is full or the connection is gone; never blocks.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize and enqueue an event.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match event.to_wire() {
            Ok(wire) => self.send(Arc::new(wire)),
            Err(_) => false,
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection alive (pong or inbound activity).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Check and reset the alive flag for the heartbeat tick.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Force-close: cancels the session loop, which sends a close frame and
    /// tears the socket down. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the handle is closed.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
