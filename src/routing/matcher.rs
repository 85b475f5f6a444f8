//! Forward resolution: hostname to host.
//!
//! # Responsibilities
//! - Walk the host table in declaration order
//! - Return the first host whose anchored pattern matches, with its params
//! - Fall back to the default host with empty params
//!
//! # Design Decisions
//! - First match wins; more specific hosts must be declared first
//! - The default host is validated at construction, so matching never fails
//! - Matching is pure: no request state, safe to call repeatedly

use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigError;
use crate::routing::host::{Host, HostParams};
use crate::routing::table::HostTable;

/// Result of matching a hostname.
#[derive(Debug, Clone)]
pub struct HostMatch {
    pub host: Arc<Host>,
    pub params: HostParams,
}

/// Matches hostnames against a host table.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    table: Arc<HostTable>,
    default: Arc<Host>,
}

impl HostMatcher {
    /// Fails when `default_host` is unset or names no host in `table`.
    pub fn new(table: Arc<HostTable>, default_host: Option<&str>) -> Result<Self, ConfigError> {
        let name = default_host.ok_or(ConfigError::MissingSetting("default_host"))?;
        let default = table
            .host(name)
            .map_err(ConfigError::InvalidDefaultHost)?
            .clone();

        Ok(Self { table, default })
    }

    pub fn table(&self) -> &Arc<HostTable> {
        &self.table
    }

    pub fn default_host(&self) -> &Arc<Host> {
        &self.default
    }

    /// Match `hostname`. Never fails.
    pub fn match_host(&self, hostname: &str) -> HostMatch {
        for host in self.table.iter() {
            if let Some(params) = host.pattern().captures(hostname) {
                debug!(hostname, host = host.name(), "Host matched");
                return HostMatch {
                    host: host.clone(),
                    params,
                };
            }
        }

        debug!(hostname, host = self.default.name(), "No host matched, using default");
        HostMatch {
            host: self.default.clone(),
            params: HostParams::default(),
        }
    }
}
