//! Public TCP socket registry (spec §4.4/§5): `socket_id → live public
//! socket`, used to route inbound `TcpResponse` frames back to the public
//! connection that originated the tunneled bytes.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

/// Per-session registry of connected public TCP sockets, keyed by the
/// peer's `ip:port` (the `socket_id` of spec §4.4).
#[derive(Clone)]
pub struct SocketRegistry {
    inner: Arc<DashMap<String, mpsc::UnboundedSender<Vec<u8>>>>,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    pub fn insert(&self, socket_id: String, tx: mpsc::UnboundedSender<Vec<u8>>) {
        self.inner.insert(socket_id, tx);
    }

    pub fn remove(&self, socket_id: &str) {
        self.inner.remove(socket_id);
    }

    /// Writes `data` to the socket named by `socket_id`, if it is still
    /// connected. Frames for a socket that already closed are dropped
    /// silently, matching the best-effort TCP close semantics of spec §4.4.
    pub fn send(&self, socket_id: &str, data: Vec<u8>) -> bool {
        match self.inner.get(socket_id) {
            Some(tx) => tx.send(data).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl Default for SocketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_to_registered_socket() {
        let registry = SocketRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.insert("127.0.0.1:9999".into(), tx);

        assert!(registry.send("127.0.0.1:9999", b"ping".to_vec()));
        assert_eq!(rx.recv().await.unwrap(), b"ping");
    }

    #[tokio::test]
    async fn drops_frame_for_unknown_socket() {
        let registry = SocketRegistry::new();
        assert!(!registry.send("nowhere:1", b"x".to_vec()));
    }

    #[tokio::test]
    async fn remove_stops_routing() {
        let registry = SocketRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.insert("s1".into(), tx);
        registry.remove("s1");
        assert_eq!(registry.len(), 0);
        assert!(!registry.send("s1", b"x".to_vec()));
    }
}
