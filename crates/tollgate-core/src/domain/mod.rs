//! Domain types - the vocabulary of an admission decision.

mod decision;
mod identity;
mod window;

pub use decision::{Decision, DecisionRequest, Denial, RateLimitVerdict};
pub use identity::{ClientIdentity, UNKNOWN_IDENTITY};
pub use window::WindowConfig;
