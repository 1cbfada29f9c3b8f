//! Livereload client script endpoint.

use axum::http::header;
use axum::response::IntoResponse;

/// Handle GET /livereload.js.
pub(crate) async fn get_livereload_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript")],
        lrs_assets::livereload_js().into_owned(),
    )
}
