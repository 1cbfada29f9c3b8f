//! Static file serving.
//!
//! Maps request paths onto the served directory, falls back to
//! `index.html` for directories, and streams the result. HTML responses get
//! the reload script injected on the fly.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::error::ServerError;
use crate::rewrite;
use crate::state::AppState;

/// Whether a resolved file gets the reload script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ContentKind {
    Html,
    Other,
}

/// A file resolved for one request.
#[derive(Debug)]
pub(crate) struct ServedFile {
    /// Absolute path on disk.
    pub(crate) path: PathBuf,
    pub(crate) kind: ContentKind,
    /// Content type header value.
    pub(crate) mime: String,
}

/// Resolve `request_path` against the canonical directory `root`.
///
/// Paths with `..` or absolute components, and symlinks whose target lies
/// outside `root`, are reported as not found.
pub(crate) async fn resolve(root: &Path, request_path: &str) -> Result<ServedFile, ServerError> {
    let decoded = percent_decode_str(request_path).decode_utf8_lossy();
    let relative = decoded.strip_prefix('/').unwrap_or(&decoded);
    let mut target = root.join(relative);

    let not_found = |target: PathBuf| ServerError::NotFound {
        request_path: decoded.clone().into_owned(),
        target,
    };

    let contained = Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !contained {
        tracing::warn!(path = %decoded, "Rejected path outside served directory");
        return Err(not_found(target));
    }

    if tokio::fs::metadata(&target)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        target.push("index.html");
    }

    // Symlinks may point anywhere; only what they resolve to counts.
    match tokio::fs::canonicalize(&target).await {
        Ok(real) if real.starts_with(root) => {}
        Ok(real) => {
            tracing::warn!(path = %decoded, target = %real.display(), "Rejected link outside served directory");
            return Err(not_found(target));
        }
        Err(_) => return Err(not_found(target)),
    }

    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_file() => {
            let kind = if lrs_assets::is_html(&target) {
                ContentKind::Html
            } else {
                ContentKind::Other
            };
            Ok(ServedFile {
                mime: lrs_assets::mime_for(&target).to_string(),
                kind,
                path: target,
            })
        }
        _ => Err(not_found(target)),
    }
}

/// Handle `GET` for any path not claimed by the livereload routes.
pub(crate) async fn serve_static(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<Response, ServerError> {
    let file = resolve(&state.root, uri.path()).await?;
    // Open before any headers are built.
    let handle = tokio::fs::File::open(&file.path).await?;

    let relative = file.path.strip_prefix(&state.root).unwrap_or(&file.path);

    let response = match file.kind {
        ContentKind::Html => {
            tracing::info!(file = %relative.display(), "Serving html with reload script");
            let body = Body::from_stream(rewrite::stream_with_injection(
                handle,
                state.payload.clone(),
                state.chunk_size,
            ));
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], body).into_response()
        }
        ContentKind::Other => {
            tracing::info!(file = %relative.display(), mime = %file.mime, "Serving file");
            let body = Body::from_stream(rewrite::stream_verbatim(handle, state.chunk_size));
            (StatusCode::OK, [(header::CONTENT_TYPE, file.mime)], body).into_response()
        }
    };

    Ok(response)
}
