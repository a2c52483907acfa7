//! Connection registry for push delivery
//!
//! Tracks every live realtime connection and its bounded outbound
//! channel. Delivery uses `try_send`, so one stalled connection never
//! blocks the broadcast path. A full or closed channel tears the
//! registration down on the spot; a torn-down connection is never
//! retried, reconnecting registers a fresh entry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use types::ids::{ConnectionId, QuizId};

/// One registered connection.
struct Registration {
    /// Deliver only this quiz's payloads; `None` receives everything.
    filter: Option<QuizId>,
    outbound: mpsc::Sender<Arc<str>>,
}

/// Concurrency-safe map of live connections.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Registration>,
    /// Connections removed after a failed send.
    torn_down: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            torn_down: AtomicU64::new(0),
        }
    }

    /// Register a connection's outbound channel.
    ///
    /// The caller keeps the receiving half; its writer task drains it
    /// into the socket.
    pub fn register(
        &self,
        outbound: mpsc::Sender<Arc<str>>,
        filter: Option<QuizId>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.connections
            .insert(connection_id, Registration { filter, outbound });
        debug!(%connection_id, ?filter, "registered connection");
        connection_id
    }

    /// Remove a connection. Idempotent.
    pub fn unregister(&self, connection_id: ConnectionId) -> bool {
        let removed = self.connections.remove(&connection_id).is_some();
        if removed {
            debug!(%connection_id, "unregistered connection");
        }
        removed
    }

    /// Send one payload to one connection.
    ///
    /// `false` means the connection was unknown or has now been torn
    /// down after a failed send.
    pub fn send_to(&self, connection_id: ConnectionId, payload: Arc<str>) -> bool {
        let reason = {
            let Some(registration) = self.connections.get(&connection_id) else {
                return false;
            };
            match registration.outbound.try_send(payload) {
                Ok(()) => return true,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            }
        };
        // The map ref from `get` is released above; `remove` takes the
        // shard write lock.
        self.tear_down(connection_id, reason);
        false
    }

    /// Deliver a payload to every connection interested in the quiz.
    ///
    /// Returns how many sends succeeded. Failed connections are torn
    /// down and skipped; the rest are unaffected.
    pub fn broadcast(&self, quiz_id: QuizId, payload: Arc<str>) -> usize {
        let mut delivered = 0;
        let mut failed: Vec<(ConnectionId, &str)> = Vec::new();

        for entry in self.connections.iter() {
            let registration = entry.value();
            if registration.filter.is_some_and(|wanted| wanted != quiz_id) {
                continue;
            }
            match registration.outbound.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => failed.push((*entry.key(), "full")),
                Err(TrySendError::Closed(_)) => failed.push((*entry.key(), "closed")),
            }
        }

        // Tear down after iteration; removing mid-iteration contends
        // with the shard lock held by the iterator.
        for (connection_id, reason) in failed {
            self.tear_down(connection_id, reason);
        }

        delivered
    }

    fn tear_down(&self, connection_id: ConnectionId, reason: &str) {
        if self.connections.remove(&connection_id).is_some() {
            self.torn_down.fetch_add(1, Ordering::Relaxed);
            warn!(%connection_id, reason, "tearing down connection after failed send");
        }
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Total connections torn down after failed sends.
    pub fn torn_down(&self) -> u64 {
        self.torn_down.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn make_quiz(n: u128) -> QuizId {
        QuizId::from_uuid(Uuid::from_u128(n))
    }

    fn payload(text: &str) -> Arc<str> {
        Arc::from(text)
    }

    #[tokio::test]
    async fn test_send_to_delivers_payload() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(4);
        let id = registry.register(tx, None);

        assert!(registry.send_to(id, payload("hello")));
        assert_eq!(rx.recv().await.unwrap().as_ref(), "hello");
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection_is_false() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to(ConnectionId::new(), payload("x")));
        assert_eq!(registry.torn_down(), 0);
    }

    #[tokio::test]
    async fn test_full_channel_tears_connection_down() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let id = registry.register(tx, None);

        assert!(registry.send_to(id, payload("first")));
        // Second send finds the bounded channel full.
        assert!(!registry.send_to(id, payload("second")));

        assert!(!registry.contains(id));
        assert_eq!(registry.torn_down(), 1);
        // Torn down means gone; a retry is a plain miss.
        assert!(!registry.send_to(id, payload("third")));
        assert_eq!(registry.torn_down(), 1);
    }

    #[tokio::test]
    async fn test_closed_channel_tears_connection_down() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::channel(4);
        let id = registry.register(tx, None);
        drop(rx);

        assert!(!registry.send_to(id, payload("gone")));
        assert!(registry.is_empty());
        assert_eq!(registry.torn_down(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_respects_quiz_filter() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let (tx_all, mut rx_all) = mpsc::channel(4);
        registry.register(tx_a, Some(make_quiz(1)));
        registry.register(tx_b, Some(make_quiz(2)));
        registry.register(tx_all, None);

        let delivered = registry.broadcast(make_quiz(1), payload("quiz-1"));

        assert_eq!(delivered, 2);
        assert_eq!(rx_a.recv().await.unwrap().as_ref(), "quiz-1");
        assert_eq!(rx_all.recv().await.unwrap().as_ref(), "quiz-1");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_survives_one_dead_connection() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, rx2) = mpsc::channel(4);
        let (tx3, mut rx3) = mpsc::channel(4);
        registry.register(tx1, None);
        let dead = registry.register(tx2, None);
        registry.register(tx3, None);

        // Kill the middle connection mid-stream.
        drop(rx2);

        let delivered = registry.broadcast(make_quiz(1), payload("update"));
        assert_eq!(delivered, 2);
        assert_eq!(rx1.recv().await.unwrap().as_ref(), "update");
        assert_eq!(rx3.recv().await.unwrap().as_ref(), "update");

        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(dead));

        // Survivors keep receiving on the next broadcast.
        let delivered = registry.broadcast(make_quiz(1), payload("again"));
        assert_eq!(delivered, 2);
        assert_eq!(rx1.recv().await.unwrap().as_ref(), "again");
        assert_eq!(rx3.recv().await.unwrap().as_ref(), "again");
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        let id = registry.register(tx, None);

        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
        // A deliberate unregister is not a teardown.
        assert_eq!(registry.torn_down(), 0);
    }
}
