//! Force reload endpoint.
//!
//! Lets editors and build scripts trigger a reload without touching files.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::live_reload::ReloadEvent;
use crate::state::AppState;

/// Query parameters for GET /forcereload.
#[derive(Debug, Deserialize)]
pub(crate) struct ForceReloadParams {
    /// Path to reload (default: everything).
    path: Option<String>,
}

/// Handle GET /forcereload.
pub(crate) async fn force_reload(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForceReloadParams>,
) -> StatusCode {
    let event = params
        .path
        .map_or_else(ReloadEvent::everything, ReloadEvent::for_path);
    state.broadcaster.reload(&event);
    StatusCode::OK
}
