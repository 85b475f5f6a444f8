//! Host-based request routing.
//!
//! Maps a request's hostname to a named host (and its urlconf) by ordered
//! regex matching, and reverses host names plus parameters back into
//! hostnames and full URLs.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   Host header   │  http::hosts_middleware                      │
//!   ─────────────▶│    → HostCache::matcher → HostMatcher        │──▶ handlers
//!                 │    → callback → urlconf::scope               │   (RequestHost,
//!                 └──────────────────────────────────────────────┘    current_urlconf)
//!
//!   host name     ┌──────────────────────────────────────────────┐
//!   + params ────▶│  HostReverser::reverse_host / reverse_full   │──▶ //host:port/path
//!                 └──────────────────────────────────────────────┘
//!
//!   config file ─▶ loader → Settings ─▶ HostCache  (cleared by ConfigWatcher)
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod routing;

pub use config::{HostCache, HostsConfig, Settings};
pub use error::{ConfigError, NoReverseMatch, ReverseError};
pub use routing::{
    patterns, HostMatch, HostMatcher, HostReverser, HostSpec, HostTable, ReverseArgs, UrlOptions,
};
