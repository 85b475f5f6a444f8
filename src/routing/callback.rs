//! Host callbacks and their registry.
//!
//! A host may name a callback by dotted path (`module.attr`). Paths are
//! resolved against a [`CallbackRegistry`] the first time the host is
//! dispatched, then cached on the host.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Extensions;
use dashmap::DashMap;

use crate::error::ConfigError;
use crate::routing::host::HostParams;

/// Runs after a host matched and before the request reaches its urlconf.
/// Annotates the request through its extensions.
pub type HostCallback = Arc<dyn Fn(&mut Extensions, &HostParams) + Send + Sync>;

/// The callback used when a host has none configured.
pub fn noop() -> HostCallback {
    Arc::new(|_, _| {})
}

/// How a host refers to its callback.
#[derive(Clone)]
pub enum CallbackRef {
    /// Dotted path, resolved lazily.
    Path(String),
    /// Already a function.
    Func(HostCallback),
}

impl fmt::Debug for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackRef::Path(path) => f.debug_tuple("Path").field(path).finish(),
            CallbackRef::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&str> for CallbackRef {
    fn from(path: &str) -> Self {
        CallbackRef::Path(path.to_owned())
    }
}

impl From<String> for CallbackRef {
    fn from(path: String) -> Self {
        CallbackRef::Path(path)
    }
}

/// Concurrent map of module name to its named callbacks.
#[derive(Default)]
pub struct CallbackRegistry {
    modules: DashMap<String, HashMap<String, HostCallback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `path` (`module.attr`).
    pub fn register<F>(&self, path: &str, callback: F)
    where
        F: Fn(&mut Extensions, &HostParams) + Send + Sync + 'static,
    {
        let (module, attr) = split_path(path);
        self.modules
            .entry(module.to_owned())
            .or_default()
            .insert(attr.to_owned(), Arc::new(callback));
    }

    /// Declare a module without callbacks, so lookups report a missing
    /// attribute rather than a missing module.
    pub fn register_module(&self, module: &str) {
        self.modules.entry(module.to_owned()).or_default();
    }

    /// Resolve a dotted path.
    pub fn resolve(&self, path: &str) -> Result<HostCallback, ConfigError> {
        let (module, attr) = split_path(path);
        let entry = self
            .modules
            .get(module)
            .ok_or_else(|| ConfigError::CallbackModule {
                module: module.to_owned(),
            })?;

        entry
            .get(attr)
            .cloned()
            .ok_or_else(|| ConfigError::CallbackAttribute {
                module: module.to_owned(),
                attr: attr.to_owned(),
            })
    }
}

fn split_path(path: &str) -> (&str, &str) {
    path.rsplit_once('.').unwrap_or((path, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Site(String);

    #[test]
    fn test_register_and_resolve() {
        let registry = CallbackRegistry::new();
        registry.register("sites.callbacks.request_site", |ext, params| {
            let slug = params.get("slug").unwrap_or_default().to_owned();
            ext.insert(Site(slug));
        });

        let callback = registry.resolve("sites.callbacks.request_site").unwrap();
        let mut ext = Extensions::new();
        let params = HostParams::from_named([("slug".to_string(), "blog".to_string())]);
        callback(&mut ext, &params);
        assert_eq!(ext.get::<Site>(), Some(&Site("blog".into())));
    }

    #[test]
    fn test_missing_module() {
        let registry = CallbackRegistry::new();
        let err = registry.resolve("whatever.non_existent").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Could not import 'whatever'. Error was: No module named whatever"
        );
    }

    #[test]
    fn test_missing_attribute() {
        let registry = CallbackRegistry::new();
        registry.register_module("host_router");
        let err = registry.resolve("host_router.non_existent").err().unwrap();
        assert!(matches!(
            err,
            ConfigError::CallbackAttribute { ref module, ref attr }
                if module == "host_router" && attr == "non_existent"
        ));
    }

    #[test]
    fn test_noop_leaves_request_alone() {
        let mut ext = Extensions::new();
        noop()(&mut ext, &HostParams::default());
        assert!(ext.get::<Site>().is_none());
    }
}
