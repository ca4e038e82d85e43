//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod clock;
mod counter;
mod rate_limit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{CountError, CountOutcome, RequestCounter};
pub use rate_limit::{RateLimitError, RateLimiter};
