//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use host_router::config::{parse_config, HostCache, HostsConfig, Settings};
use host_router::routing::{HostReverser, UrlConfRegistry};

/// Hosts used throughout the tests, in match order.
pub const SIMPLE: &str = r#"
root_hostconf = "simple"
default_host = "www"

[[hostconfs]]
id = "simple"
hosts = [
    { regex = 'www\.example\.com', urlconf = "urls.simple", name = "www" },
    { regex = 'static', urlconf = "urls.simple", name = "static" },
    { regex = '(\w+)', urlconf = "urls.simple", name = "with_args" },
    { regex = '(?P<username>\w+)', urlconf = "urls.simple", name = "with_kwargs" },
    { regex = 's(?P<subdomain>\w+)', urlconf = "urls.complex", name = "with_view_kwargs", callback = "tests.callbacks.subdomain" },
    { regex = 'admin', urlconf = "urls.simple", name = "admin", scheme = "https", port = "8443" },
]

[[hostconfs]]
id = "blank"
hosts = [
    { regex = '', urlconf = "urls.simple", name = "blank" },
    { regex = '|www', urlconf = "urls.simple", name = "blank_or_www" },
]

[[urlconfs]]
id = "urls.simple"
patterns = [
    { name = "simple-direct", regex = '^simple/$' },
    { name = "user", regex = '^users/(?P<username>\w+)/$' },
]

[[urlconfs]]
id = "urls.complex"
patterns = [
    { name = "complex-direct", regex = '^complex/$' },
]
"#;

pub fn simple_config() -> HostsConfig {
    parse_config(SIMPLE).unwrap()
}

/// Cache over `config`, with its settings reachable through the cache.
pub fn cache_for(config: HostsConfig) -> Arc<HostCache> {
    Arc::new(HostCache::new(Arc::new(Settings::new(config))))
}

pub fn reverser_for(config: HostsConfig) -> HostReverser {
    let paths = Arc::new(UrlConfRegistry::from_config(&config.urlconfs).unwrap());
    HostReverser::new(cache_for(config), paths)
}
