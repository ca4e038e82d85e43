use async_trait::async_trait;
use std::time::Duration;

use crate::domain::ClientIdentity;

/// Request counter trait - reports how many requests an identity has made recently.
#[async_trait]
pub trait RequestCounter: Send + Sync {
    async fn count(&self, identity: &ClientIdentity) -> Result<CountOutcome, CountError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountOutcome {
    Counted(u64),
    /// The counting service itself refused the lookup.
    Limited { retry_after_secs: u64 },
}

/// Count lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum CountError {
    #[error("Count service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Count service unreachable: {0}")]
    Unreachable(String),
}
