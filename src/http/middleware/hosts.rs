//! Host routing middleware.
//! Matches the request's hostname and activates the host's urlconf.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::config::cache::HostCache;
use crate::error::ConfigError;
use crate::routing::{urlconf, CallbackRegistry, Host, HostParams};

/// State for [`hosts_middleware`].
#[derive(Clone)]
pub struct HostsState {
    pub cache: Arc<HostCache>,
    pub callbacks: Arc<CallbackRegistry>,
}

impl HostsState {
    /// Builds the root host table and default host up front, so a broken
    /// configuration fails here rather than on the first request.
    pub fn new(cache: Arc<HostCache>, callbacks: Arc<CallbackRegistry>) -> Result<Self, ConfigError> {
        cache.matcher()?;
        Ok(Self { cache, callbacks })
    }
}

/// The matched host, attached to the request extensions.
#[derive(Clone, Debug)]
pub struct RequestHost {
    pub host: Arc<Host>,
    pub params: HostParams,
}

impl RequestHost {
    pub fn name(&self) -> &str {
        self.host.name()
    }

    pub fn urlconf(&self) -> &str {
        self.host.urlconf()
    }
}

pub async fn hosts_middleware(
    State(state): State<HostsState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let hostname = request_hostname(&req);

    let matched = match state.cache.match_host(&hostname) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "Host routing is misconfigured");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Host routing is misconfigured").into_response();
        }
    };

    let callback = match matched.host.callback(&state.callbacks) {
        Ok(callback) => callback,
        Err(e) => {
            error!(host = matched.host.name(), error = %e, "Host callback unavailable");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Host callback unavailable").into_response();
        }
    };
    let active: Arc<str> = Arc::from(matched.host.urlconf());
    urlconf::sync_scope(active.clone(), || callback(req.extensions_mut(), &matched.params));

    req.extensions_mut().insert(RequestHost {
        host: matched.host,
        params: matched.params,
    });

    urlconf::scope(active, next.run(req)).await
}

/// Hostname of the request: `Host` header, else the URI authority.
/// Port removed, lower-cased.
fn request_hostname(req: &Request<Body>) -> String {
    let raw = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().host())
        .unwrap_or_default();

    strip_port(raw.trim()).to_ascii_lowercase()
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}
