//! Reload fan-out to every registered client.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use super::protocol::ServerMessage;
use super::registry::{ClientRegistry, Outbound};

/// Wildcard path meaning "reload everything".
pub(crate) const RELOAD_ALL: &str = "*";

/// Request to reload clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ReloadEvent {
    path: String,
}

impl ReloadEvent {
    pub(crate) fn everything() -> Self {
        Self::for_path(RELOAD_ALL)
    }

    pub(crate) fn for_path(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct BroadcastReport {
    /// Clients the message was queued for.
    pub(crate) delivered: usize,
    /// Clients whose queue was full; they stay registered.
    pub(crate) skipped: usize,
    /// Clients found disconnected and pruned.
    pub(crate) pruned: usize,
}

/// Sends reload notifications to all clients in a [`ClientRegistry`].
#[derive(Clone)]
pub(crate) struct ReloadBroadcaster {
    registry: Arc<ClientRegistry>,
}

impl ReloadBroadcaster {
    pub(crate) fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Queue a reload message for every registered client.
    ///
    /// Works on a snapshot of the registry; a client that disconnected is
    /// pruned and the broadcast carries on with the rest.
    pub(crate) fn reload(&self, event: &ReloadEvent) -> BroadcastReport {
        tracing::info!(path = event.path(), "Reloading");

        let message = ServerMessage::reload(event.path());
        let mut report = BroadcastReport::default();

        for (id, tx) in self.registry.snapshot() {
            match tx.try_send(Outbound::Message(message.clone())) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(client = %id, "Livereload client is not keeping up, skipping reload");
                    report.skipped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(client = %id, "Pruning disconnected livereload client");
                    self.registry.remove(id);
                    report.pruned += 1;
                }
            }
        }

        tracing::debug!(?report, "Broadcast finished");
        report
    }
}
