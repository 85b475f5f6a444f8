//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing / config / http produce:
//!     → tracing events (matches, cache population, reloads)
//!
//! Consumers:
//!     → logging.rs (fmt subscriber on stderr, RUST_LOG filter)
//! ```

pub mod logging;

pub use logging::init_logging;
