//! Error types for the HTTP server.

use std::path::PathBuf;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Requested static file does not exist (including a missing `index.html`).
    #[error("Not found! {request_path} (file: {})", .target.display())]
    NotFound {
        /// Decoded request path as sent by the browser.
        request_path: String,
        /// Filesystem location the request resolved to.
        target: PathBuf,
    },

    /// The directory to serve is missing or not a directory.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Listener could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address as configured.
        address: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// File watcher could not be started.
    #[error("Failed to watch files: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
