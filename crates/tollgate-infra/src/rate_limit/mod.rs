//! Rate limiting implementations.

mod memory;

pub use memory::{InMemoryRateLimiter, WindowCounter, WindowRecord};

#[cfg(feature = "remote")]
mod remote;
#[cfg(feature = "remote")]
pub use self::remote::{DecisionMethod, RemoteRateLimitConfig, RemoteRateLimiter};
