//! HTTP request handlers for the livereload endpoints.

pub(crate) mod force_reload;
pub(crate) mod script;
