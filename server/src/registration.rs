//! Registration state machine (spec §4.7 / C7).
//!
//! `Connected -> Registering -> Registered | Rejected`. `Registering` and
//! `Rejected` are transient — by the time this function returns, the
//! session is either `Registered` (tunnel live) or back to `Connected`
//! with an `Error` frame queued (spec §4, Open Question 4: a session whose
//! `Register` was rejected may retry with different parameters).

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tracing::{info, warn};
use tunnel_protocol::{Frame, Protocol};

use crate::error::TunnelError;
use crate::listener::{spawn_http_listener, spawn_tcp_listener};
use crate::session::{Session, SessionState, TunnelInfo};
use crate::state::AppState;

pub async fn handle_register(
    state: &AppState,
    session: &Arc<Session>,
    local_port: u16,
    public_port: u16,
    protocol: Protocol,
) -> Result<Frame, TunnelError> {
    if session.is_registered().await {
        return Err(TunnelError::AlreadyRegistered);
    }

    // Reserve the public port atomically — spec §3 invariant 1.
    let reservation = match state.ports.entry(public_port) {
        Entry::Occupied(_) => return Err(TunnelError::PortInUse(public_port)),
        Entry::Vacant(v) => {
            v.insert(session.id.clone());
        }
    };
    let _ = reservation;

    let bind_result = match protocol {
        Protocol::Http => spawn_http_listener(state.clone(), session.clone(), public_port).await,
        Protocol::Tcp => spawn_tcp_listener(session.clone(), public_port).await,
    };

    let handle = match bind_result {
        Ok(handle) => handle,
        Err(e) => {
            state.ports.remove(&public_port);
            warn!(public_port, error = %e, "failed to bind public listener");
            return Err(e);
        }
    };

    session.track_listener(handle).await;
    *session.tunnel.write().await = Some(TunnelInfo {
        local_port,
        public_port,
        protocol,
    });
    *session.state.write().await = SessionState::Registered;

    let scheme = match protocol {
        Protocol::Http => "http",
        Protocol::Tcp => "tcp",
    };
    let public_url = format!("{scheme}://{}:{public_port}", state.config.advertise_host);

    info!(
        session_id = %session.id,
        local_port,
        public_port,
        %protocol,
        "tunnel registered"
    );

    Ok(Frame::Registered {
        session_id: session.id.clone(),
        local_port,
        public_port,
        protocol,
        public_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::config::ServerConfig;

    fn config() -> ServerConfig {
        ServerConfig {
            bind_port: 0,
            advertise_host: "localhost".into(),
            pending_timeout_secs: 30,
            pending_capacity: 1024,
        }
    }

    fn new_session(id: &str, state: &AppState) -> Arc<Session> {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(id.to_string(), tx);
        state.sessions.insert(session.id.clone(), session.clone());
        session
    }

    #[tokio::test]
    async fn registers_successfully() {
        let state = AppState::new(config());
        let session = new_session("s1", &state);

        let result = handle_register(&state, &session, 3000, 0, Protocol::Http).await;
        assert!(result.is_ok());
        assert!(session.is_registered().await);
    }

    #[tokio::test]
    async fn rejects_port_already_in_use() {
        let state = AppState::new(config());
        let session1 = new_session("s1", &state);
        handle_register(&state, &session1, 3000, 0, Protocol::Http)
            .await
            .unwrap();

        let session2 = new_session("s2", &state);
        let result = handle_register(&state, &session2, 3001, 0, Protocol::Http).await;
        assert!(matches!(result, Err(TunnelError::PortInUse(0))));
        assert!(!session2.is_registered().await);
    }

    #[tokio::test]
    async fn rejects_double_registration() {
        let state = AppState::new(config());
        let session = new_session("s1", &state);
        handle_register(&state, &session, 3000, 0, Protocol::Http)
            .await
            .unwrap();

        let result = handle_register(&state, &session, 3000, 1, Protocol::Http).await;
        assert!(matches!(result, Err(TunnelError::AlreadyRegistered)));
    }
}
