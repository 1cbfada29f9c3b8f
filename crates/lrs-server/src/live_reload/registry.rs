//! Registry of connected livereload clients.
//!
//! Entries are keyed by a per-connection id and hold only the sending half of
//! the client's outbound queue. The connection task owns the socket, so a
//! registry entry never keeps a channel alive: when the task ends its
//! receiver is dropped and the next send to that entry fails.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::protocol::ServerMessage;

/// Outbound queue depth per client.
pub(crate) const OUTBOUND_CAPACITY: usize = 16;

/// Stable identifier of one livereload connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ClientId(Uuid);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Instruction delivered to a connection task.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outbound {
    Message(ServerMessage),
    Close,
}

/// Concurrency-safe set of connected clients.
#[derive(Default)]
pub(crate) struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, mpsc::Sender<Outbound>>>,
}

impl ClientRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new client and return its id and outbound queue.
    pub(crate) fn register(&self) -> (ClientId, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let id = ClientId(Uuid::new_v4());
        self.clients.lock().insert(id, tx);
        (id, rx)
    }

    /// Remove a client. Returns `false` if it was already gone.
    pub(crate) fn remove(&self, id: ClientId) -> bool {
        self.clients.lock().remove(&id).is_some()
    }

    /// Copy of the current membership, safe to iterate while clients leave.
    pub(crate) fn snapshot(&self) -> Vec<(ClientId, mpsc::Sender<Outbound>)> {
        self.clients
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.clients.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: ClientId) -> bool {
        self.clients.lock().contains_key(&id)
    }

    /// Empty the registry and tell every connection task to close.
    ///
    /// Returns the number of clients that were registered.
    pub(crate) fn close_all(&self) -> usize {
        let drained: Vec<_> = self.clients.lock().drain().collect();
        for (id, tx) in &drained {
            // A full or closed queue still ends the task once `tx` is dropped.
            if tx.try_send(Outbound::Close).is_err() {
                tracing::debug!(client = %id, "Client queue unavailable during shutdown");
            }
        }
        drained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_adds_unique_clients() {
        let registry = ClientRegistry::new();
        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(a));
        assert!(registry.contains(b));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ClientRegistry::new();
        let (id, _rx) = registry.register();

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(!registry.contains(id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_snapshot_survives_removal() {
        let registry = ClientRegistry::new();
        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();

        let snapshot = registry.snapshot();
        registry.remove(a);
        registry.remove(b);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_close_all_notifies_and_empties() {
        let registry = ClientRegistry::new();
        let (_a, mut rx_a) = registry.register();
        let (_b, mut rx_b) = registry.register();

        assert_eq!(registry.close_all(), 2);
        assert_eq!(registry.len(), 0);
        assert_eq!(rx_a.try_recv().unwrap(), Outbound::Close);
        assert_eq!(rx_b.try_recv().unwrap(), Outbound::Close);
    }

    #[test]
    fn test_concurrent_register_and_remove() {
        let registry = std::sync::Arc::new(ClientRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = std::sync::Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let (id, _rx) = registry.register();
                        let _ = registry.snapshot();
                        assert!(registry.remove(id));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 0);
    }
}
