//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;

use crate::inject;
use crate::live_reload::{ClientRegistry, ReloadBroadcaster};

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Canonical directory being served.
    pub(crate) root: PathBuf,
    /// Script tag injected into HTML responses.
    pub(crate) payload: Bytes,
    /// Read size for streamed files.
    pub(crate) chunk_size: usize,
    /// Connected livereload clients.
    pub(crate) registry: Arc<ClientRegistry>,
    /// Fan-out over `registry`.
    pub(crate) broadcaster: ReloadBroadcaster,
}

impl AppState {
    /// Build state for serving `root`, advertising `port` to browsers.
    pub(crate) fn new(root: PathBuf, port: u16, chunk_size: usize) -> Self {
        let registry = Arc::new(ClientRegistry::new());
        Self {
            root,
            payload: inject::injection_payload(port),
            chunk_size,
            broadcaster: ReloadBroadcaster::new(Arc::clone(&registry)),
            registry,
        }
    }
}
