//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use ::metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use huddle_core::{ClientEvent, ConnectionId, ServerEvent};

use crate::metrics::{
    TRANSITION_ERRORS_TOTAL, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_CONNECTION_DURATION_SECONDS, WS_DISCONNECTIONS_TOTAL,
};
use crate::server::AppState;
use crate::ws::connection::ConnectionHandle;

/// Outbound queue depth per connection; slow readers drop frames rather
/// than blocking the sender.
const SEND_QUEUE_DEPTH: usize = 256;

/// Run a WebSocket session for a connected client.
///
/// 1. Emits `welcome` so the client knows to validate
/// 2. Dispatches inbound frames through the presence protocol
/// 3. Forwards outbound events via the send channel, with periodic pings
/// 4. Tears down on close frames, malformed frames, refused transitions,
///    heartbeat timeout, or force-close (superseded handle)
/// 5. Runs the disconnect transition exactly once on the way out
#[instrument(skip_all, fields(connection_id))]
pub async fn run_ws_session(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::generate();
    let _ = tracing::Span::current().record("connection_id", connection_id.as_str());

    let (mut ws_tx, mut ws_rx) = socket.split();

    if state.connections.fetch_add(1, Ordering::Relaxed) >= state.config.max_connections {
        let _ = state.connections.fetch_sub(1, Ordering::Relaxed);
        warn!("connection limit reached, refusing client");
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    }

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(SEND_QUEUE_DEPTH);
    let connection = Arc::new(ConnectionHandle::new(connection_id.clone(), send_tx));

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    // Greeting precedes any handshake.
    if let Ok(wire) = ServerEvent::Welcome.to_wire() {
        let _ = ws_tx.send(Message::Text(wire.into())).await;
    }

    // Outbound forwarder: queued frames, periodic pings, force-close.
    let outbound_conn = Arc::clone(&connection);
    let ping_interval = Duration::from_secs(state.config.heartbeat_interval_secs);
    let pong_timeout = Duration::from_secs(state.config.heartbeat_timeout_secs);
    let outbound = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = ticker.tick().await;

        loop {
            tokio::select! {
                frame = send_rx.recv() => {
                    match frame {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                                outbound_conn.close();
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!("client unresponsive for {pong_timeout:?}, disconnecting");
                        outbound_conn.close();
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        outbound_conn.close();
                        break;
                    }
                }
                () = outbound_conn.closed() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Inbound loop: every frame is a tagged protocol event.
    loop {
        let message = tokio::select! {
            received = ws_rx.next() => match received {
                Some(Ok(message)) => message,
                Some(Err(err)) => {
                    debug!(error = %err, "transport error");
                    break;
                }
                None => break,
            },
            () = connection.closed() => break,
        };

        let text = match message {
            Message::Text(ref text) => text.to_string(),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(text) => text.to_owned(),
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                continue;
            }
        };
        connection.mark_alive();

        // Malformed frames close the connection with no error payload.
        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "malformed frame, closing connection");
                counter!(TRANSITION_ERRORS_TOTAL, "code" => "MALFORMED_REQUEST").increment(1);
                break;
            }
        };

        if let Err(err) = state.protocol.handle_event(&connection, event).await {
            warn!(code = err.code(), error = %err, "transition refused, closing connection");
            counter!(TRANSITION_ERRORS_TOTAL, "code" => err.code()).increment(1);
            break;
        }
    }

    // The disconnect transition is a no-op if this handle was superseded.
    state.protocol.disconnect(&connection_id);
    connection.close();
    outbound.abort();

    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
    let _ = state.connections.fetch_sub(1, Ordering::Relaxed);
    info!("client disconnected");
}
