//! REST introspection endpoints (SPEC_FULL.md §5, supplemented feature).
//!
//! Modeled on the original relay's `GET /api/agents`: a read-only view of
//! server state, useful for external tooling/dashboards.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::session::SessionState;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionListItem {
    pub session_id: String,
    pub state: &'static str,
    pub tunnel: Option<TunnelView>,
}

#[derive(Serialize)]
pub struct TunnelView {
    pub local_port: u16,
    pub public_port: u16,
    pub protocol: String,
}

fn state_label(state: SessionState) -> &'static str {
    match state {
        SessionState::Connected => "connected",
        SessionState::Registered => "registered",
        SessionState::Closing => "closing",
        SessionState::Closed => "closed",
    }
}

/// `GET /api/sessions` — every live session and its tunnel, if registered.
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionListItem>> {
    let mut items = Vec::with_capacity(state.sessions.len());
    for entry in state.sessions.iter() {
        let session = entry.value();
        let tunnel = session.tunnel.read().await.as_ref().map(|t| TunnelView {
            local_port: t.local_port,
            public_port: t.public_port,
            protocol: t.protocol.to_string(),
        });
        items.push(SessionListItem {
            session_id: session.id.clone(),
            state: state_label(*session.state.read().await),
            tunnel,
        });
    }
    Json(items)
}

/// `GET /healthz` — liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}
