//! Server-wide shared state: the session registry and the public-port map.
//!
//! Uses `DashMap` for lock-free concurrent access across WebSocket handler
//! tasks and public listener tasks, the same pattern the original relay
//! server used for its agent/connection/session registries.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::session::Session;

/// Generates a short, unique session id.
///
/// Format: 8 lowercase hex characters, e.g. `a3f8b2c1`.
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// Generates a unique request id for one HTTP request or TCP chunk.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Shared application state, cloned into every request handler and
/// listener task.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions, keyed by session id.
    pub sessions: Arc<DashMap<String, Arc<Session>>>,

    /// Registered tunnels, keyed by public port (spec §3 invariant 1: at
    /// most one session per public port).
    pub ports: Arc<DashMap<u16, String>>,

    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ports: Arc::new(DashMap::new()),
            config: Arc::new(config),
        }
    }

    /// Removes a session and releases the public port it held, if any.
    /// Called once the session's control channel has closed.
    pub async fn forget_session(&self, session: &Session) {
        if let Some(tunnel) = session.tunnel.read().await.as_ref() {
            self.ports.remove(&tunnel.public_port);
        }
        self.sessions.remove(&session.id);
    }
}
