//! Live-reloading static file server.
//!
//! Serves a directory over HTTP and keeps connected browsers in sync with it:
//! - HTML responses are streamed with a small script injected before
//!   `</head>` (or `</body>`, or at the end)
//! - The script loads `/livereload.js`, which connects back over a WebSocket
//!   at `/livereload` speaking the livereload protocol
//! - File changes (or `GET /forcereload`) broadcast a reload to every client
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use lrs_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::new(PathBuf::from("site"));
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (lrs-server)
//!                        │
//!                        ├─► GET /<path>  ──► resolve ──► stream (+ inject script)
//!                        │
//!                        ├─► GET /livereload (WebSocket) ──► ClientRegistry
//!                        │                                       ▲
//!                        ├─► GET /forcereload ──► ReloadBroadcaster
//!                        │                            ▲
//!                        └─────────── notify ──► debouncer
//! ```

mod app;
mod error;
mod handlers;
mod inject;
mod live_reload;
mod rewrite;
mod state;
mod static_files;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

pub use error::ServerError;
use live_reload::FileWatcher;
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory to serve and watch.
    pub root: PathBuf,
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on (0 picks a free port).
    pub port: u16,
    /// Read size for streamed files.
    pub chunk_size: usize,
    /// Broadcast reloads when files change.
    pub watch_enabled: bool,
    /// Quiet period before a change is broadcast.
    pub debounce: Duration,
    /// Glob patterns, relative to `root`, that never trigger a reload.
    pub ignore: Vec<String>,
}

impl ServerConfig {
    /// Configuration with default settings for serving `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        server_config_from_lrs_config(&lrs_config::Config::default(), root)
    }
}

/// Create server configuration from an lrs config.
#[must_use]
pub fn server_config_from_lrs_config(config: &lrs_config::Config, root: PathBuf) -> ServerConfig {
    ServerConfig {
        root,
        host: config.server.host.clone(),
        port: config.server.port,
        chunk_size: config.serve.chunk_size,
        watch_enabled: config.watch.enabled,
        debounce: Duration::from_millis(config.watch.debounce_ms),
        ignore: config.watch.ignore.clone(),
    }
}

/// A bound, not yet running, live-reload server.
pub struct LiveReloadServer {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
    host: String,
    watcher: Option<FileWatcher>,
}

impl LiveReloadServer {
    /// Validate the root, bind the listener and start watching.
    ///
    /// # Errors
    ///
    /// Returns an error if `config.root` is not a directory, the address
    /// cannot be bound, or the file watcher fails to start.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let root = match tokio::fs::canonicalize(&config.root).await {
            Ok(root) if root.is_dir() => root,
            _ => return Err(ServerError::NotADirectory(config.root)),
        };

        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| ServerError::Bind {
                address: format!("{}:{}", config.host, config.port),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let state = Arc::new(AppState::new(
            root.clone(),
            local_addr.port(),
            config.chunk_size,
        ));

        let watcher = if config.watch_enabled {
            let mut watcher = FileWatcher::new(
                root,
                &config.ignore,
                config.debounce,
                state.broadcaster.clone(),
            );
            watcher.start()?;
            Some(watcher)
        } else {
            None
        };

        Ok(Self {
            state,
            listener,
            local_addr,
            host: config.host,
            watcher,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL browsers should open.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.local_addr.port())
    }

    #[cfg(test)]
    fn broadcaster(&self) -> live_reload::ReloadBroadcaster {
        self.state.broadcaster.clone()
    }

    /// Serve until `shutdown` resolves.
    ///
    /// On shutdown every livereload client is closed before in-flight HTTP
    /// connections drain.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while accepting connections.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let registry = Arc::clone(&self.state.registry);
        let app = app::create_router(self.state);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let closed = registry.close_all();
                tracing::info!(clients = closed, "Closed livereload clients");
            })
            .await?;

        drop(self.watcher);
        Ok(())
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let server = LiveReloadServer::bind(config).await?;
    tracing::info!(url = %server.url(), "Serving");
    server.serve(shutdown_signal()).await
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
