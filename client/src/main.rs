//! # Tunnel Client
//!
//! Exposes a local TCP or HTTP service to the internet through a
//! `tunnel-server` control channel. See `SPEC_FULL.md` for the full
//! component breakdown.
//!
//! ## Modules
//!
//! - [`cli`]         — command-line flags (spec §6)
//! - [`error`]        — `ClientError`
//! - [`control`]      — Control Channel, client half (C2)
//! - [`dispatcher`]   — Origin Dispatcher (C6): HTTP replay + TCP relay
//! - [`supervisor`]   — reconnect loop and registration handshake (C8)

mod cli;
mod control;
mod dispatcher;
mod error;
mod supervisor;

use clap::Parser;
use tokio::net::TcpStream;
use tracing::info;

use crate::cli::Cli;
use crate::supervisor::SupervisorConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunnel_client=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let protocol = match cli.protocol() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let local_port = cli.local_port();
    if let Err(e) = check_local_service(local_port).await {
        eprintln!("error: local service on port {local_port} is not reachable: {e}");
        std::process::exit(1);
    }

    info!(
        local_port,
        server_port = cli.server_port,
        protocol = %cli.protocol,
        "starting tunnel client"
    );

    let config = SupervisorConfig {
        control_url: cli.control_url(),
        local_port,
        public_port: cli.server_port,
        protocol,
    };

    tokio::select! {
        _ = supervisor::run(config) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }
}

/// Spec §6 precondition: refuse to start if the local service isn't even
/// listening, rather than registering a tunnel that can never succeed.
async fn check_local_service(local_port: u16) -> std::io::Result<()> {
    TcpStream::connect(("127.0.0.1", local_port)).await?;
    Ok(())
}
