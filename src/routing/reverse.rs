//! Reverse resolution: host name and parameters back to a hostname or URL.
//!
//! # Data Flow
//! ```text
//! reverse_host("with_args", ["johndoe"])
//!     │
//!     ├─► HostCache::host(name)          (memoized, NoReverseMatch if unknown)
//!     ├─► templates in preference order  ("{_0}")
//!     │     └─ skip on parameter shape mismatch
//!     ├─► render + verify against pattern ("johndoe")
//!     └─► join parent host               ("johndoe.spam.eggs")
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use url::form_urlencoded;

use crate::config::cache::HostCache;
use crate::error::{NoReverseMatch, ReverseError};
use crate::routing::host::Host;
use crate::routing::urlconf::PathReverser;

/// Positional or keyword parameters for a reverse call.
///
/// Supplying both is a usage error reported by every reverse operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseArgs {
    pub args: Vec<String>,
    pub kwargs: BTreeMap<String, String>,
}

impl ReverseArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: values.into_iter().map(Into::into).collect(),
            kwargs: BTreeMap::new(),
        }
    }

    pub fn keyword<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            args: Vec::new(),
            kwargs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn is_mixed(&self) -> bool {
        !self.args.is_empty() && !self.kwargs.is_empty()
    }

    fn check(&self) -> Result<(), ReverseError> {
        if self.is_mixed() {
            Err(ReverseError::MixedArguments)
        } else {
            Ok(())
        }
    }
}

/// Per-call overrides for [`HostReverser::reverse_full`].
#[derive(Debug, Clone, Default)]
pub struct UrlOptions {
    pub scheme: Option<String>,
    pub port: Option<String>,
}

impl UrlOptions {
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }
}

/// `None` and `""` give `default`; `https` and `https:` both give `https://`.
pub fn normalize_scheme(scheme: Option<&str>, default: &str) -> String {
    match scheme {
        None | Some("") => default.to_owned(),
        Some(s) if s.ends_with(':') => format!("{s}//"),
        Some(s) if !s.contains("//") => format!("{s}://"),
        Some(s) => s.to_owned(),
    }
}

/// `80`, `:80`, `80:` and `:80:` all give `:80`; `None` and `""` give `""`.
pub fn normalize_port(port: Option<&str>) -> String {
    match port.map(|p| p.trim_matches(':')) {
        None | Some("") => String::new(),
        Some(p) => format!(":{p}"),
    }
}

/// Reverse `host` against its own templates, then append `parent`.
///
/// The first template whose parameter shape fits `args` and whose rendering
/// is accepted by the host's pattern wins.
pub fn reverse_host_with(
    host: &Host,
    args: &ReverseArgs,
    parent: Option<&str>,
) -> Result<String, ReverseError> {
    args.check()?;

    let pattern = host.pattern();
    let candidate = pattern
        .templates()
        .iter()
        .filter_map(|template| template.render_args(&args.args, &args.kwargs))
        .find(|candidate| pattern.verifies(candidate))
        .ok_or_else(|| NoReverseMatch::Host {
            host: host.name().to_owned(),
            args: args.args.clone(),
            kwargs: args.kwargs.clone(),
        })?;

    Ok(join_parent(candidate, parent))
}

fn join_parent(candidate: String, parent: Option<&str>) -> String {
    match parent.map(|p| p.trim_start_matches('.')) {
        None | Some("") => candidate,
        Some(parent) if candidate.is_empty() => parent.to_owned(),
        Some(parent) => format!("{candidate}.{parent}"),
    }
}

/// Reverse resolver bound to a host cache and a path-reversal collaborator.
#[derive(Clone)]
pub struct HostReverser {
    cache: Arc<HostCache>,
    paths: Arc<dyn PathReverser>,
}

impl HostReverser {
    pub fn new(cache: Arc<HostCache>, paths: Arc<dyn PathReverser>) -> Self {
        Self { cache, paths }
    }

    pub fn cache(&self) -> &Arc<HostCache> {
        &self.cache
    }

    /// Hostname for `name`, joined with the configured parent host.
    pub fn reverse_host(&self, name: &str, args: &ReverseArgs) -> Result<String, ReverseError> {
        args.check()?;
        let host = self.cache.host(name)?;
        let settings = self.cache.settings();
        reverse_host_with(&host, args, settings.parent_host.as_deref())
    }

    /// Full URL for `view` on `host`: scheme, hostname, port and path.
    ///
    /// With host emulation enabled, the URL points at the local emulation
    /// endpoint instead, carrying host and path as query parameters.
    pub fn reverse_full(
        &self,
        host: &str,
        view: &str,
        host_args: &ReverseArgs,
        view_args: &ReverseArgs,
        options: &UrlOptions,
    ) -> Result<String, ReverseError> {
        host_args.check()?;
        view_args.check()?;

        let route = self.cache.host(host)?;
        let settings = self.cache.settings();

        let hostname = reverse_host_with(&route, host_args, settings.parent_host.as_deref())?;
        let path = self
            .paths
            .reverse_path(route.urlconf(), view, &view_args.args, &view_args.kwargs)?;

        let scheme = match options.scheme.as_deref() {
            Some(scheme) => normalize_scheme(Some(scheme), "//"),
            None => route
                .scheme()
                .map(str::to_owned)
                .unwrap_or_else(|| normalize_scheme(settings.host_scheme.as_deref(), "//")),
        };
        let port = match options.port.as_deref() {
            Some(port) => normalize_port(Some(port)),
            None => route
                .port()
                .map(str::to_owned)
                .unwrap_or_else(|| normalize_port(settings.host_port.as_deref())),
        };

        if settings.emulate_hosts {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("host", &format!("{hostname}{port}"))
                .append_pair("path", &path)
                .finish();
            return Ok(format!("{}?{query}", settings.emulate_hosts_path));
        }

        Ok(format!("{scheme}{hostname}{port}{path}"))
    }
}
