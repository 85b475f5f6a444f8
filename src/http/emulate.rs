//! Host emulation endpoint for development.
//!
//! With `emulate_hosts` enabled, full URLs point here instead of at the
//! reversed host, so subdomains work without DNS entries. The endpoint
//! redirects to the real location.

use axum::{
    extract::Query,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EmulatedTarget {
    pub host: Option<String>,
    pub path: Option<String>,
}

/// `302` to `//<host><path>`; `400` unless both parameters are present.
pub async fn emulated_redirect(Query(target): Query<EmulatedTarget>) -> Response {
    match (target.host, target.path) {
        (Some(host), Some(path)) if !host.is_empty() => {
            let path = if path.starts_with('/') { path } else { format!("/{path}") };
            (StatusCode::FOUND, [(header::LOCATION, format!("//{host}{path}"))]).into_response()
        }
        _ => (StatusCode::BAD_REQUEST, "Missing host or path parameter").into_response(),
    }
}

/// Router serving [`emulated_redirect`] at `path`.
pub fn emulation_router<S>(path: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(path, get(emulated_redirect))
}
