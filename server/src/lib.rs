//! # Tunnel Relay Server
//!
//! Accepts client control channels over WebSocket, registers a tunnel per
//! session, and owns the public HTTP/TCP listeners that serve the internet
//! side of each tunnel. See `SPEC_FULL.md` for the full component
//! breakdown.
//!
//! ## Architecture
//!
//! ```text
//! Public caller ──HTTP/TCP──► Listener (C4) ──► Multiplexer (C5)
//!                                                     │
//!                                         Control Channel (C2, WebSocket)
//!                                                     │
//!                                                     ▼
//!                                              Client (Origin Dispatcher)
//! ```
//!
//! ## Modules
//!
//! - [`config`]       — CLI flags
//! - [`error`]         — `TunnelError` and its spec §7 disposition
//! - [`state`]         — Shared application state (session/port registries)
//! - [`session`]       — Per-session state (C3 pending table, C4 sockets)
//! - [`pending`]       — Pending Table (C3)
//! - [`sockets`]       — TCP public-socket registry
//! - [`registration`]  — Registration state machine (C7)
//! - [`listener`]      — Public Listener Manager (C4)
//! - [`mux`]           — Request Multiplexer (C5)
//! - [`handlers`]      — WebSocket connection lifecycle and message dispatch
//! - [`api`]           — REST introspection endpoints

pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod mux;
pub mod pending;
pub mod registration;
pub mod session;
pub mod sockets;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

pub use config::ServerConfig;
pub use state::AppState;

/// Builds the full axum app (control-channel WebSocket + REST introspection
/// routes) over a fresh [`AppState`]. Split out of `main` so integration
/// tests can drive the server in-process without spawning the binary.
pub fn build_app(config: ServerConfig) -> (Router, AppState) {
    let state = AppState::new(config);
    let app = Router::new()
        .route("/ws", get(handlers::ws_handler))
        .route("/api/sessions", get(api::list_sessions))
        .route("/healthz", get(api::healthz))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());
    (app, state)
}
