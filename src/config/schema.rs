//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for host routing.
//! All types derive Serde traits for deserialization from config files.
//!
//! ```toml
//! root_hostconf = "mysite.hosts"
//! default_host = "www"
//! parent_host = "example.com"
//!
//! [[hostconfs]]
//! id = "mysite.hosts"
//!
//! [[hostconfs.hosts]]
//! regex = 'www'
//! urlconf = "mysite.urls"
//! name = "www"
//! ```

use serde::{Deserialize, Serialize};

use crate::routing::{CallbackRef, HostSpec};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostsConfig {
    /// Id of the hostconf whose hosts are matched against requests.
    pub root_hostconf: Option<String>,

    /// Host used when no pattern matches.
    pub default_host: Option<String>,

    /// Suffix appended to every reversed hostname (e.g. "example.com").
    pub parent_host: Option<String>,

    /// Default scheme for full URLs; `//` when unset.
    pub host_scheme: Option<String>,

    /// Default port for full URLs.
    pub host_port: Option<String>,

    /// Point full URLs at the local redirect endpoint instead of real hosts.
    pub emulate_hosts: bool,

    /// Path of the redirect endpoint used when `emulate_hosts` is set.
    pub emulate_hosts_path: String,

    /// Host tables, addressable by id.
    pub hostconfs: Vec<HostconfConfig>,

    /// Path tables used to reverse views.
    pub urlconfs: Vec<UrlconfConfig>,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            root_hostconf: None,
            default_host: None,
            parent_host: None,
            host_scheme: None,
            host_port: None,
            emulate_hosts: false,
            emulate_hosts_path: "/__hosts__/redirect/".to_string(),
            hostconfs: Vec::new(),
            urlconfs: Vec::new(),
        }
    }
}

impl HostsConfig {
    pub fn hostconf(&self, id: &str) -> Option<&HostconfConfig> {
        self.hostconfs.iter().find(|h| h.id == id)
    }
}

/// A named host table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostconfConfig {
    pub id: String,

    /// Prefix applied to every host's urlconf.
    #[serde(default)]
    pub prefix: String,

    /// Hosts in match order. A hostconf without this key is declared but
    /// unusable.
    pub hosts: Option<Vec<HostConfig>>,
}

/// A single host entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    pub regex: String,
    pub urlconf: String,
    pub name: String,

    /// Dotted path of a registered callback.
    pub callback: Option<String>,

    #[serde(default)]
    pub prefix: String,

    pub scheme: Option<String>,
    pub port: Option<String>,
}

impl HostConfig {
    pub fn to_spec(&self) -> HostSpec {
        HostSpec {
            regex: self.regex.clone(),
            urlconf: self.urlconf.clone(),
            name: self.name.clone(),
            callback: self.callback.clone().map(CallbackRef::Path),
            prefix: self.prefix.clone(),
            scheme: self.scheme.clone(),
            port: self.port.clone(),
        }
    }
}

/// A named path table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UrlconfConfig {
    pub id: String,

    #[serde(default)]
    pub patterns: Vec<PathConfig>,
}

/// A named path pattern, written without the leading slash.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathConfig {
    pub name: String,
    pub regex: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: HostsConfig = toml::from_str("").unwrap();
        assert!(config.root_hostconf.is_none());
        assert!(!config.emulate_hosts);
        assert_eq!(config.emulate_hosts_path, "/__hosts__/redirect/");
    }

    #[test]
    fn test_full_config() {
        let config: HostsConfig = toml::from_str(
            r#"
            root_hostconf = "mysite.hosts"
            default_host = "www"
            parent_host = "example.com"
            host_scheme = "https"
            host_port = "8443"

            [[hostconfs]]
            id = "mysite.hosts"
            prefix = "mysite"

            [[hostconfs.hosts]]
            regex = 'www'
            urlconf = "urls"
            name = "www"

            [[hostconfs.hosts]]
            regex = '(?P<username>\w+)'
            urlconf = "users.urls"
            name = "user"
            callback = "users.callbacks.user"
            scheme = "http"

            [[urlconfs]]
            id = "mysite.urls"
            patterns = [{ name = "about", regex = '^about/$' }]
            "#,
        )
        .unwrap();

        let hostconf = config.hostconf("mysite.hosts").unwrap();
        assert_eq!(hostconf.prefix, "mysite");
        let hosts = hostconf.hosts.as_ref().unwrap();
        assert_eq!(hosts.len(), 2);

        let spec = hosts[1].to_spec();
        assert_eq!(spec.name, "user");
        assert!(matches!(spec.callback, Some(CallbackRef::Path(ref p)) if p == "users.callbacks.user"));
        assert_eq!(spec.scheme.as_deref(), Some("http"));
        assert_eq!(config.urlconfs[0].patterns[0].name, "about");
    }

    #[test]
    fn test_hostconf_without_hosts() {
        let config: HostsConfig = toml::from_str(
            r#"
            [[hostconfs]]
            id = "empty"
            "#,
        )
        .unwrap();
        assert!(config.hostconf("empty").unwrap().hosts.is_none());
        assert!(config.hostconf("other").is_none());
    }
}
