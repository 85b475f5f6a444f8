//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (ArcSwap<HostsConfig>)
//!     → cache.rs (memoized root table, hosts, matcher)
//!
//! On reload:
//!     watcher.rs detects change
//!     → loader.rs loads and checks new config
//!     → Settings::replace (atomic swap)
//!     → HostCache::clear
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Missing settings surface on first use, as configuration errors

pub mod cache;
pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;
pub mod watcher;

pub use cache::HostCache;
pub use loader::{check_config, load_config, parse_config};
pub use schema::{HostConfig, HostconfConfig, HostsConfig, PathConfig, UrlconfConfig};
pub use settings::Settings;
pub use watcher::ConfigWatcher;
