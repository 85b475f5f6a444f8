//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Host compilation (at startup / after reload):
//!     HostSpec[] (regex, urlconf, name, callback, scheme, port)
//!     → pattern.rs (anchored regex + reversal templates)
//!     → table.rs (ordered, name-unique HostTable)
//!
//! Forward (per request):
//!     hostname
//!     → matcher.rs (first match in declaration order, else default)
//!     → HostMatch { host, params }
//!     → callback.rs (resolve + run host callback)
//!     → urlconf.rs (activate host urlconf for the request)
//!
//! Reverse (per URL generation):
//!     host name + args/kwargs
//!     → reverse.rs (template substitution, verification, parent host)
//!     → urlconf.rs PathReverser (view path)
//!     → scheme + host + port + path
//! ```
//!
//! # Design Decisions
//! - Tables are compiled once and never mutated; reload replaces them
//! - First match wins; no specificity ranking or overlap detection
//! - Patterns that cannot be reversed are rejected when compiled

pub mod callback;
pub mod host;
pub mod matcher;
pub mod pattern;
pub mod reverse;
pub mod table;
pub mod urlconf;

pub use callback::{CallbackRef, CallbackRegistry, HostCallback};
pub use host::{Host, HostParams, HostSpec};
pub use matcher::{HostMatch, HostMatcher};
pub use pattern::{normalize, HostPattern, Template};
pub use reverse::{
    normalize_port, normalize_scheme, reverse_host_with, HostReverser, ReverseArgs, UrlOptions,
};
pub use table::{patterns, HostTable, RESERVED_HOST_NAME};
pub use urlconf::{current_urlconf, PathReverser, UrlConfRegistry};
