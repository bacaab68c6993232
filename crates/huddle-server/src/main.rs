//! Huddle server binary — wires the store, verifier, and presence server
//! together and runs until interrupted.

#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use huddle_auth::{CredentialVerifier, SecretCipher};
use huddle_server::config::ServerConfig;
use huddle_server::server::HuddleServer;
use huddle_server::{metrics, sweeper};
use huddle_store::RedisStore;

/// Huddle presence server.
#[derive(Parser, Debug)]
#[command(name = "huddle-server", about = "Room presence server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "4566")]
    port: u16,

    /// Session store URL.
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Base64-encoded 32-byte shared key for client secret decryption.
    #[arg(long, env = "HUDDLE_SECRET_KEY")]
    secret_key: String,

    /// Seconds a disconnected session survives before eviction.
    #[arg(long, default_value_t = 3600)]
    inactive_ttl_secs: u64,

    /// Serve Prometheus metrics on this port (off when omitted).
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let metrics_handle = metrics::install_recorder();

    let cipher =
        SecretCipher::from_base64(&args.secret_key).context("Invalid HUDDLE_SECRET_KEY")?;
    let store = RedisStore::connect(&args.redis_url)
        .await
        .context("Failed to connect to session store")?;

    let config = ServerConfig {
        host: args.host.clone(),
        port: args.port,
        inactive_ttl_secs: args.inactive_ttl_secs,
        ..ServerConfig::default()
    };

    let server = HuddleServer::new(config.clone(), Arc::new(store), CredentialVerifier::new(cipher));

    // Metrics listener stays off the primary surface; bind it separately.
    if let Some(port) = args.metrics_port {
        let handle = metrics_handle.clone();
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
        let listener = tokio::net::TcpListener::bind((args.host.as_str(), port))
            .await
            .context("Failed to bind metrics listener")?;
        tracing::info!(port, "metrics listening");
        drop(tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        }));
    }

    // Eviction sweeper
    let sweeper_handle = tokio::spawn(sweeper::run_sweeper(
        Arc::clone(server.protocol().registry()),
        Duration::from_secs(config.inactive_ttl_secs),
        Duration::from_secs(config.sweep_interval_secs),
        server.shutdown().clone(),
    ));

    let (addr, serve_handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("huddle listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("shutting down...");
    server.shutdown().cancel();
    let _ = serve_handle.await;
    let _ = sweeper_handle.await;
    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["huddle-server", "--secret-key", "abc"]);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 4566);
        assert_eq!(cli.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(cli.inactive_ttl_secs, 3600);
        assert_eq!(cli.metrics_port, None);
    }

    #[test]
    fn cli_custom_values() {
        let cli = Cli::parse_from([
            "huddle-server",
            "--secret-key",
            "abc",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--metrics-port",
            "9100",
            "--inactive-ttl-secs",
            "120",
        ]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.metrics_port, Some(9100));
        assert_eq!(cli.inactive_ttl_secs, 120);
    }
}
