//! Request middleware.

pub mod hosts;

pub use hosts::{hosts_middleware, HostsState, RequestHost};
