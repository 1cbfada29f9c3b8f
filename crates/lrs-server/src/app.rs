//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::live_reload;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/livereload.js", get(handlers::script::get_livereload_js))
        .route("/livereload", get(live_reload::ws_handler))
        .route("/forcereload", get(handlers::force_reload::force_reload))
        .route("/", get(static_files::serve_static))
        .route("/{*path}", get(static_files::serve_static))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
