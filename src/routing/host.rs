//! Host definitions.
//!
//! A [`Host`] binds a compiled hostname pattern to a urlconf, an optional
//! callback and an optional scheme/port policy. Hosts are built from
//! [`HostSpec`] declarations and are immutable afterwards, apart from the
//! once-only callback resolution.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::ConfigError;
use crate::routing::callback::{self, CallbackRef, CallbackRegistry, HostCallback};
use crate::routing::pattern::HostPattern;
use crate::routing::reverse::{normalize_port, normalize_scheme};

/// Parameters captured from a hostname.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostParams {
    named: BTreeMap<String, String>,
    positional: Vec<String>,
}

impl HostParams {
    pub fn from_named(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            named: pairs.into_iter().collect(),
            positional: Vec::new(),
        }
    }

    pub fn from_positional(values: impl IntoIterator<Item = String>) -> Self {
        Self {
            named: BTreeMap::new(),
            positional: values.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn named(&self) -> &BTreeMap<String, String> {
        &self.named
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

/// Declaration of a host, before compilation.
///
/// Tuples of `(regex, urlconf, name)` convert into a spec.
#[derive(Debug, Clone)]
pub struct HostSpec {
    pub regex: String,
    pub urlconf: String,
    pub name: String,
    pub callback: Option<CallbackRef>,
    pub prefix: String,
    pub scheme: Option<String>,
    pub port: Option<String>,
}

impl HostSpec {
    pub fn new(regex: impl Into<String>, urlconf: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            regex: regex.into(),
            urlconf: urlconf.into(),
            name: name.into(),
            callback: None,
            prefix: String::new(),
            scheme: None,
            port: None,
        }
    }

    pub fn callback(mut self, callback: impl Into<CallbackRef>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn callback_fn<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut axum::http::Extensions, &HostParams) + Send + Sync + 'static,
    {
        self.callback = Some(CallbackRef::Func(std::sync::Arc::new(callback)));
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }
}

impl<R, U, N> From<(R, U, N)> for HostSpec
where
    R: Into<String>,
    U: Into<String>,
    N: Into<String>,
{
    fn from((regex, urlconf, name): (R, U, N)) -> Self {
        HostSpec::new(regex, urlconf, name)
    }
}

/// A compiled host.
pub struct Host {
    name: String,
    pattern: HostPattern,
    urlconf: String,
    callback: Option<CallbackRef>,
    resolved: OnceCell<HostCallback>,
    scheme: Option<String>,
    port: Option<String>,
}

impl Host {
    /// Compile a spec. `table_prefix` is the prefix of the enclosing table;
    /// it is applied after the spec's own prefix, each exactly once.
    pub fn from_spec(spec: HostSpec, table_prefix: &str) -> Result<Self, ConfigError> {
        let pattern = HostPattern::compile(&spec.regex)?;
        let urlconf = add_prefix(table_prefix, &add_prefix(&spec.prefix, &spec.urlconf));

        Ok(Self {
            name: spec.name,
            pattern,
            urlconf,
            callback: spec.callback,
            resolved: OnceCell::new(),
            scheme: spec.scheme.map(|s| normalize_scheme(Some(s.as_str()), "//")),
            port: spec.port.map(|p| normalize_port(Some(p.as_str()))).filter(|p| !p.is_empty()),
        })
    }

    pub fn new(regex: &str, urlconf: &str, name: &str) -> Result<Self, ConfigError> {
        Self::from_spec(HostSpec::new(regex, urlconf, name), "")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &HostPattern {
        &self.pattern
    }

    pub fn regex(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn urlconf(&self) -> &str {
        &self.urlconf
    }

    /// Normalized scheme override, e.g. `https://`.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Normalized port override, e.g. `:8000`.
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// The host's callback, resolving a dotted path on first use.
    ///
    /// A failed resolution is not cached and fails again on the next call.
    pub fn callback(&self, registry: &CallbackRegistry) -> Result<HostCallback, ConfigError> {
        match &self.callback {
            None => Ok(callback::noop()),
            Some(CallbackRef::Func(callback)) => Ok(callback.clone()),
            Some(CallbackRef::Path(path)) => self
                .resolved
                .get_or_try_init(|| registry.resolve(path))
                .cloned(),
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<host {}: {} ({:?})>", self.name, self.urlconf, self.regex())
    }
}

fn add_prefix(prefix: &str, urlconf: &str) -> String {
    let prefix = prefix.trim_end_matches('.');
    if prefix.is_empty() {
        urlconf.to_owned()
    } else {
        format!("{prefix}.{urlconf}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_host_debug() {
        let host = Host::new("api", "api.urls", "api").unwrap();
        assert_eq!(format!("{host:?}"), "<host api: api.urls (\"api\")>");
    }

    #[test]
    fn test_host_prefix() {
        let host = Host::from_spec(HostSpec::new("api", "api.urls", "api").prefix("spam.eggs"), "").unwrap();
        assert_eq!(host.urlconf(), "spam.eggs.api.urls");

        let host = Host::from_spec(HostSpec::new("api", "api.urls", "api"), "mysite.").unwrap();
        assert_eq!(host.urlconf(), "mysite.api.urls");
    }

    #[test]
    fn test_scheme_and_port_are_normalized() {
        let host = Host::from_spec(
            HostSpec::new("admin", "admin.urls", "admin").scheme("https").port("8443:"),
            "",
        )
        .unwrap();
        assert_eq!(host.scheme(), Some("https://"));
        assert_eq!(host.port(), Some(":8443"));

        let host = Host::new("www", "urls", "www").unwrap();
        assert_eq!(host.scheme(), None);
        assert_eq!(host.port(), None);
    }

    #[test]
    fn test_string_callback_is_resolved_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = CallbackRegistry::new();
        let counter = calls.clone();
        registry.register("hooks.count", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let host = Host::from_spec(HostSpec::new("api", "api.urls", "api").callback("hooks.count"), "").unwrap();
        let first = host.callback(&registry).unwrap();
        let second = host.callback(&CallbackRegistry::new()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        second(&mut axum::http::Extensions::new(), &HostParams::default());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callable_callback() {
        let host = Host::from_spec(
            HostSpec::new("api", "api.urls", "api").callback_fn(|ext, _| {
                ext.insert(42u32);
            }),
            "",
        )
        .unwrap();
        let mut ext = axum::http::Extensions::new();
        host.callback(&CallbackRegistry::new()).unwrap()(&mut ext, &HostParams::default());
        assert_eq!(ext.get::<u32>(), Some(&42));
    }

    #[test]
    fn test_unresolvable_callback() {
        let host = Host::from_spec(
            HostSpec::new("api", "api.urls", "api").callback("whatever.non_existent"),
            "",
        )
        .unwrap();
        let err = host.callback(&CallbackRegistry::new()).err().unwrap();
        assert!(matches!(err, ConfigError::CallbackModule { .. }));
    }

    #[test]
    fn test_tuple_spec() {
        let spec: HostSpec = (r"api", "api.urls", "api").into();
        assert_eq!(spec.name, "api");
        assert!(spec.callback.is_none());
    }
}
