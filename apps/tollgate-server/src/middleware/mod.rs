//! Middleware modules.

pub mod client_ip;
pub mod error;
pub mod rate_limit;
