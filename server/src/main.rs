//! Binary entry point for `tunnel-server`. See the `tunnel_server` crate
//! root (`lib.rs`) for the component breakdown.

use clap::Parser;
use std::net::SocketAddr;
use tracing::info;

use tunnel_server::{build_app, ServerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunnel_server=info".into()),
        )
        .init();

    let config = ServerConfig::parse();
    let bind_port = config.bind_port;
    let (app, _state) = build_app(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], bind_port));
    info!("tunnel server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind control port {addr}: {e}"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    info!("shutdown signal received");
}
