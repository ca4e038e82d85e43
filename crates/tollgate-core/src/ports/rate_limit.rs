//! Rate limiting port.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{Decision, DecisionRequest};

/// Rate limiter trait - abstraction over admission backends (local window, remote service).
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Decide whether the request may proceed, updating any counters it owns.
    ///
    /// HTTP-level answers, including error statuses, come back as a [`Decision`].
    /// Only a failure to get an answer at all is an `Err`.
    async fn check(&self, request: &DecisionRequest<'_>) -> Result<Decision, RateLimitError>;
}

/// Rate limit errors - the decision service could not be asked.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Decision service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Decision service unreachable: {0}")]
    Unreachable(String),
}
