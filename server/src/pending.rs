//! Pending Table (spec §4.3 / C3): one-shot completion sinks keyed by
//! `request_id`, each with a deadline.
//!
//! Mutated from three places per spec §5's shared-resource model — the
//! Request Multiplexer inserts, the Control Channel's receive loop
//! completes on reply, and a per-entry timer completes on timeout — so it
//! is backed by a `DashMap` for atomic-per-key access rather than a single
//! owning task, the same choice the teacher made for its agent/session
//! registries in `server/src/state.rs`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;
use tunnel_protocol::Headers;

/// The eventual outcome of one pending HTTP request.
#[derive(Debug)]
pub enum PendingOutcome {
    /// A matching `HttpResponse` frame arrived.
    Replied {
        status: u16,
        headers: Headers,
        body: Option<Vec<u8>>,
        error: Option<String>,
    },
    /// The deadline elapsed before a reply arrived (→ 504).
    Timeout,
    /// The session closed before a reply arrived (→ 502).
    Gone,
}

struct Entry {
    tx: oneshot::Sender<PendingOutcome>,
}

/// Per-session table of in-flight public HTTP requests.
#[derive(Clone)]
pub struct PendingTable {
    inner: Arc<DashMap<String, Entry>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Registers `request_id` with a deadline. Returns `None` if the id is
    /// already present (spec invariant: keys unique) — callers mint fresh
    /// UUIDs so this should never happen in practice, but the contract is
    /// enforced rather than assumed.
    ///
    /// Spawns a timer task that completes the entry with
    /// [`PendingOutcome::Timeout`] if it is still present when the
    /// deadline elapses.
    pub fn insert(
        &self,
        request_id: String,
        deadline: Duration,
    ) -> Option<oneshot::Receiver<PendingOutcome>> {
        if self.inner.contains_key(&request_id) {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.inner.insert(request_id.clone(), Entry { tx });

        let table = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if table.complete(&request_id, PendingOutcome::Timeout) {
                debug!(request_id, "pending request timed out");
            }
        });

        Some(rx)
    }

    /// Completes and removes `request_id`'s entry, if present. Returns
    /// `true` if a waiting caller actually received `value`; `false` means
    /// the entry was already gone (late reply, already timed out, or
    /// already drained) — per spec invariant 5, such frames are dropped
    /// silently.
    pub fn complete(&self, request_id: &str, value: PendingOutcome) -> bool {
        match self.inner.remove(request_id) {
            Some((_, entry)) => entry.tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Completes every remaining entry with [`PendingOutcome::Gone`] and
    /// empties the table. Called on session teardown (spec invariant 4).
    pub fn drain(&self) {
        let ids: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.complete(&id, PendingOutcome::Gone);
        }
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_delivers_to_waiter() {
        let table = PendingTable::new();
        let rx = table.insert("r1".into(), Duration::from_secs(30)).unwrap();
        assert!(table.complete(
            "r1",
            PendingOutcome::Replied {
                status: 200,
                headers: Headers::new(),
                body: None,
                error: None,
            }
        ));
        let outcome = rx.await.unwrap();
        matches!(outcome, PendingOutcome::Replied { status: 200, .. });
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let table = PendingTable::new();
        assert!(table.insert("dup".into(), Duration::from_secs(30)).is_some());
        assert!(table.insert("dup".into(), Duration::from_secs(30)).is_none());
    }

    #[tokio::test]
    async fn late_complete_after_drain_is_noop() {
        let table = PendingTable::new();
        let rx = table.insert("r1".into(), Duration::from_secs(30)).unwrap();
        table.drain();
        assert_eq!(table.len(), 0);
        let outcome = rx.await.unwrap();
        matches!(outcome, PendingOutcome::Gone);
        // Completing an id no longer present is a silent no-op.
        assert!(!table.complete("r1", PendingOutcome::Timeout));
    }

    #[tokio::test]
    async fn timeout_fires_when_not_completed() {
        let table = PendingTable::new();
        let rx = table
            .insert("r1".into(), Duration::from_millis(20))
            .unwrap();
        let outcome = rx.await.unwrap();
        matches!(outcome, PendingOutcome::Timeout);
        assert_eq!(table.len(), 0);
    }
}
