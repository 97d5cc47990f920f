//! Session (spec §3): everything owned by one live control channel.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tunnel_protocol::{Frame, Protocol};

use crate::pending::PendingTable;
use crate::sockets::SocketRegistry;

/// Lifecycle states from spec §3's Session data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Registered,
    Closing,
    Closed,
}

/// The tunnel a session has registered, once `Register` succeeds.
#[derive(Debug, Clone)]
pub struct TunnelInfo {
    pub local_port: u16,
    pub public_port: u16,
    pub protocol: Protocol,
}

/// One connected client's session. Shared via `Arc` between the WebSocket
/// receive loop (which owns the authoritative lifecycle), the listener
/// tasks it spawns, and the REST introspection endpoint.
pub struct Session {
    pub id: String,
    outbound: mpsc::UnboundedSender<Frame>,
    pub tunnel: RwLock<Option<TunnelInfo>>,
    pub pending: PendingTable,
    pub sockets: SocketRegistry,
    pub state: RwLock<SessionState>,
    listener_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    pub fn new(id: String, outbound: mpsc::UnboundedSender<Frame>) -> Arc<Self> {
        Arc::new(Self {
            id,
            outbound,
            tunnel: RwLock::new(None),
            pending: PendingTable::new(),
            sockets: SocketRegistry::new(),
            state: RwLock::new(SessionState::Connected),
            listener_handles: Mutex::new(Vec::new()),
        })
    }

    /// Enqueues one frame for the outbound writer task. Concurrent callers
    /// (multiple public requests on the same session) never interleave
    /// mid-frame because the channel serializes whole `Frame` values —
    /// spec §4.2's ordering guarantee falls out of `mpsc`'s FIFO delivery.
    pub fn send(&self, frame: Frame) -> bool {
        self.outbound.send(frame).is_ok()
    }

    pub async fn is_registered(&self) -> bool {
        self.tunnel.read().await.is_some()
    }

    pub async fn track_listener(&self, handle: JoinHandle<()>) {
        self.listener_handles.lock().await.push(handle);
    }

    /// Tears down everything owned by this session: aborts its listener
    /// task(s), drains the pending table (each entry resolves to a 502),
    /// and marks the session `Closed`. Idempotent.
    pub async fn close(&self) {
        {
            let mut state = self.state.write().await;
            if *state == SessionState::Closed {
                return;
            }
            *state = SessionState::Closing;
        }

        let handles = std::mem::take(&mut *self.listener_handles.lock().await);
        for handle in handles {
            handle.abort();
        }

        self.pending.drain();

        *self.state.write().await = SessionState::Closed;
    }
}
