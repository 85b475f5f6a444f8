//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (Host header)
//!     → middleware/hosts.rs (match host, run callback, attach RequestHost)
//!     → urlconf::scope(host urlconf)
//!         → application handlers (read RequestHost / current_urlconf)
//!
//! emulate_hosts enabled:
//!     reverse_full → /__hosts__/redirect/?host=..&path=..
//!     → emulate.rs (302 to //host/path)
//! ```

pub mod emulate;
pub mod middleware;

pub use emulate::{emulated_redirect, emulation_router};
pub use middleware::{hosts_middleware, HostsState, RequestHost};
