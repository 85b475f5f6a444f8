//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (root hostconf and default host exist)
//! - Detect duplicate ids and empty names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HostsConfig → Result<(), Vec<ValidationError>>
//! - Pattern compilation is left to table construction, which reports the
//!   regex error itself

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::HostsConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate hostconf id '{0}'")]
    DuplicateHostconf(String),

    #[error("duplicate urlconf id '{0}'")]
    DuplicateUrlconf(String),

    #[error("root_hostconf '{0}' is not declared")]
    UnknownRootHostconf(String),

    #[error("default_host '{0}' is not a host of the root hostconf")]
    UnknownDefaultHost(String),

    #[error("host with empty name in hostconf '{0}'")]
    EmptyHostName(String),

    #[error("path with empty name in urlconf '{0}'")]
    EmptyPathName(String),
}

pub fn validate_config(config: &HostsConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for hostconf in &config.hostconfs {
        if !seen.insert(hostconf.id.as_str()) {
            errors.push(ValidationError::DuplicateHostconf(hostconf.id.clone()));
        }
        if hostconf.hosts.iter().flatten().any(|h| h.name.is_empty()) {
            errors.push(ValidationError::EmptyHostName(hostconf.id.clone()));
        }
    }

    let mut seen = HashSet::new();
    for urlconf in &config.urlconfs {
        if !seen.insert(urlconf.id.as_str()) {
            errors.push(ValidationError::DuplicateUrlconf(urlconf.id.clone()));
        }
        if urlconf.patterns.iter().any(|p| p.name.is_empty()) {
            errors.push(ValidationError::EmptyPathName(urlconf.id.clone()));
        }
    }

    // Missing settings are reported when the cache first needs them.
    if let Some(root) = &config.root_hostconf {
        match config.hostconf(root) {
            None => errors.push(ValidationError::UnknownRootHostconf(root.clone())),
            Some(hostconf) => {
                if let (Some(default), Some(hosts)) = (&config.default_host, &hostconf.hosts) {
                    if !hosts.iter().any(|h| &h.name == default) {
                        errors.push(ValidationError::UnknownDefaultHost(default.clone()));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
