//! Server configuration, parsed from CLI flags.
//!
//! The distilled spec only names CLI flags for the client (§6); the server
//! gets a small ambient CLI of its own (SPEC_FULL.md §3) so the control
//! port and the two §4.3/§5 tunables aren't hardcoded.

use clap::Parser;

/// Reverse tunnel relay server.
#[derive(Debug, Clone, Parser)]
#[command(name = "tunnel-server", version, about)]
pub struct ServerConfig {
    /// Port the control channel (WebSocket) and REST API listen on.
    #[arg(long, default_value_t = 7070)]
    pub bind_port: u16,

    /// Hostname advertised in `Frame::Registered.public_url`.
    #[arg(long, default_value = "localhost")]
    pub advertise_host: String,

    /// Deadline (seconds) for a pending HTTP request before it is
    /// completed with a 504 (spec §4.3, default 30s).
    #[arg(long, default_value_t = 30)]
    pub pending_timeout_secs: u64,

    /// Maximum number of in-flight pending HTTP requests per session
    /// before new ones are rejected with 503 (spec §5 backpressure note).
    #[arg(long, default_value_t = 1024)]
    pub pending_capacity: usize,
}

impl ServerConfig {
    pub fn pending_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.pending_timeout_secs)
    }
}
