//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::cache::HostCache;
use crate::config::schema::HostsConfig;
use crate::config::settings::Settings;
use crate::config::validation::validate_config;
use crate::error::ConfigError;
use crate::routing::UrlConfRegistry;

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HostsConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<HostsConfig, ConfigError> {
    let config: HostsConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build everything the configuration describes: every host table, the
/// root matcher and the urlconfs. Reports the first error.
pub fn check_config(config: &HostsConfig) -> Result<(), ConfigError> {
    let cache = HostCache::new(Arc::new(Settings::new(config.clone())));
    for hostconf in &config.hostconfs {
        if hostconf.hosts.is_some() {
            cache.table(&hostconf.id)?;
        }
    }
    cache.matcher()?;
    UrlConfRegistry::from_config(&config.urlconfs)?;
    Ok(())
}
