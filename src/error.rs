//! Error types shared by the configuration and routing subsystems.
//!
//! # Taxonomy
//! - [`ConfigError`]: fatal, raised while loading configuration or building
//!   host tables. Never caught internally.
//! - [`NoReverseMatch`]: a reverse lookup found nothing for the given name or
//!   arguments.
//! - [`ReverseError`]: everything a reverse call can fail with, including the
//!   usage error of mixing positional and keyword arguments.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::validation::ValidationError;

/// Configuration errors. Raised eagerly, before any request is served.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// The host pattern is not a valid regular expression.
    #[error("Invalid host pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The pattern compiles but uses syntax that cannot be reversed.
    #[error("Non-reversible pattern '{pattern}': {reason}")]
    Unreversible { pattern: String, reason: String },

    #[error("Duplicate host name: {0}")]
    DuplicateHost(String),

    #[error("Reserved host name: {0}")]
    ReservedHost(String),

    #[error("Missing {0} setting")]
    MissingSetting(&'static str),

    #[error("Invalid default_host setting: {0}")]
    InvalidDefaultHost(#[source] NoReverseMatch),

    #[error("Missing host_patterns in '{0}'")]
    MissingHostPatterns(String),

    #[error("Could not import '{module}'. Error was: No module named {module}")]
    CallbackModule { module: String },

    #[error("Tried '{attr}' in module '{module}'. Error was: module '{module}' has no attribute '{attr}'")]
    CallbackAttribute { module: String, attr: String },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// No host, template or path satisfies a reverse lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NoReverseMatch {
    #[error("No host called '{0}' exists")]
    UnknownHost(String),

    #[error("Reverse host for '{host}' with arguments '{args:?}' and keyword arguments '{kwargs:?}' not found.")]
    Host {
        host: String,
        args: Vec<String>,
        kwargs: BTreeMap<String, String>,
    },

    #[error("No urlconf called '{0}' exists")]
    UnknownUrlconf(String),

    #[error("Reverse for '{view}' with arguments '{args:?}' and keyword arguments '{kwargs:?}' not found in '{urlconf}'.")]
    Path {
        view: String,
        urlconf: String,
        args: Vec<String>,
        kwargs: BTreeMap<String, String>,
    },
}

/// Errors returned by reverse resolution.
#[derive(Debug, Error)]
pub enum ReverseError {
    /// Both positional and keyword arguments were supplied.
    #[error("Don't mix positional and keyword arguments in a call to reverse")]
    MixedArguments,

    #[error(transparent)]
    NoMatch(#[from] NoReverseMatch),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
