//! # Tollgate Infrastructure
//!
//! Concrete implementations of the ports defined in `tollgate-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - In-process window counter only
//! - `remote` - HTTP decision and count services via reqwest

pub mod counter;
pub mod rate_limit;

// Re-exports - In-Memory
pub use counter::LocalRequestCounter;
pub use rate_limit::{InMemoryRateLimiter, WindowCounter, WindowRecord};

// Re-exports - Remote
#[cfg(feature = "remote")]
pub use counter::{RemoteCountConfig, RemoteRequestCounter};
#[cfg(feature = "remote")]
pub use rate_limit::{DecisionMethod, RemoteRateLimitConfig, RemoteRateLimiter};
