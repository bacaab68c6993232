//! `HuddleServer` — Axum HTTP + WebSocket server.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::Method;
use axum::response::Response;
use axum::routing::get;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use huddle_auth::CredentialVerifier;
use huddle_store::{Catalog, SessionStore};

use crate::config::ServerConfig;
use crate::presence::protocol::PresenceProtocol;
use crate::presence::registry::ConnectionRegistry;
use crate::ws::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The presence state machine.
    pub protocol: Arc<PresenceProtocol>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Cancelled on shutdown.
    pub shutdown: CancellationToken,
    /// Live WebSocket connection count (enforces `max_connections`).
    pub connections: Arc<AtomicUsize>,
}

/// The presence server: two liveness endpoints and the WebSocket gateway.
pub struct HuddleServer {
    state: AppState,
}

impl HuddleServer {
    /// Wire the server from its collaborators.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn SessionStore>,
        verifier: CredentialVerifier,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let protocol = Arc::new(PresenceProtocol::new(
            registry,
            Catalog::new(store),
            Arc::new(verifier),
            Duration::from_secs(config.auth_timeout_secs),
        ));
        Self {
            state: AppState {
                protocol,
                config: Arc::new(config),
                shutdown: CancellationToken::new(),
                connections: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    /// Build the Axum router. The HTTP surface is deliberately small: two
    /// liveness endpoints and the WebSocket upgrade.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true);

        Router::new()
            .route("/", get(liveness))
            .route("/health", get(liveness))
            .route("/ws", get(ws_handler))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve. Returns the bound address and the serve task, which
    /// drains gracefully once [`shutdown`](Self::shutdown) is cancelled.
    pub async fn listen(&self) -> io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            tokio::net::TcpListener::bind((self.state.config.host.as_str(), self.state.config.port))
                .await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.state.shutdown.clone();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
        });
        Ok((addr, handle))
    }

    /// The presence protocol (and through it, the registry).
    #[must_use]
    pub fn protocol(&self) -> &Arc<PresenceProtocol> {
        &self.state.protocol
    }

    /// The shutdown token; cancel it to drain the server.
    #[must_use]
    pub fn shutdown(&self) -> &CancellationToken {
        &self.state.shutdown
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET `/` and `/health`: liveness only, body `OK`.
async fn liveness() -> &'static str {
    "OK"
}

/// GET `/ws`: upgrade and run the presence session.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use huddle_auth::SecretCipher;
    use huddle_store::MemoryStore;

    fn make_server() -> HuddleServer {
        HuddleServer::new(
            ServerConfig::default(),
            Arc::new(MemoryStore::new()),
            CredentialVerifier::new(SecretCipher::new(&[1u8; 32])),
        )
    }

    #[tokio::test]
    async fn default_config_binds_loopback() {
        let server = make_server();
        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().port, 0);
    }

    #[tokio::test]
    async fn liveness_endpoints_return_ok() {
        let server = make_server();
        for uri in ["/", "/health"] {
            let app = server.router();
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let resp = app.oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
            assert_eq!(&body[..], b"OK");
        }
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let req = Request::builder()
            .uri("/rooms")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_route_requires_upgrade() {
        let server = make_server();
        let req = Request::builder().uri("/ws").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        // A plain GET without upgrade headers is rejected.
        assert_ne!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listen_binds_and_drains_on_shutdown() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("shutdown timed out")
            .expect("join error");
    }

    #[tokio::test]
    async fn registry_starts_empty() {
        let server = make_server();
        assert_eq!(server.protocol().registry().session_count(), 0);
    }
}
