//! In-process request counter.

use std::sync::Arc;

use async_trait::async_trait;

use tollgate_core::domain::ClientIdentity;
use tollgate_core::ports::{CountError, CountOutcome, RequestCounter};

use crate::rate_limit::InMemoryRateLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountMode {
    /// The gate already counted this request in the same window.
    Observe,
    /// Nothing else counts requests; every lookup is a hit.
    Record,
}

/// Counts requests with the in-memory window counter.
pub struct LocalRequestCounter {
    windows: Arc<InMemoryRateLimiter>,
    mode: CountMode,
}

impl LocalRequestCounter {
    /// Report the counts of a limiter that is also gating requests.
    pub fn observing(windows: Arc<InMemoryRateLimiter>) -> Self {
        Self {
            windows,
            mode: CountMode::Observe,
        }
    }

    /// Count every lookup in a window store of its own.
    pub fn recording(windows: Arc<InMemoryRateLimiter>) -> Self {
        Self {
            windows,
            mode: CountMode::Record,
        }
    }
}

#[async_trait]
impl RequestCounter for LocalRequestCounter {
    async fn count(&self, identity: &ClientIdentity) -> Result<CountOutcome, CountError> {
        let count = match self.mode {
            CountMode::Observe => self.windows.current_count(identity).await,
            CountMode::Record => self.windows.record(identity).await,
        };
        Ok(CountOutcome::Counted(u64::from(count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tollgate_core::domain::{DecisionRequest, WindowConfig};
    use tollgate_core::ports::{ManualClock, RateLimiter};

    fn windows() -> Arc<InMemoryRateLimiter> {
        Arc::new(InMemoryRateLimiter::with_clock(
            WindowConfig::new(Duration::from_secs(30), 6).unwrap(),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        ))
    }

    #[tokio::test]
    async fn test_observing_reports_gate_counts() {
        let windows = windows();
        let counter = LocalRequestCounter::observing(windows.clone());
        let ip = ClientIdentity::normalize("192.0.2.1");
        let request = DecisionRequest {
            identity: &ip,
            method: "GET",
            path: "/api/count",
        };

        windows.check(&request).await.unwrap();
        windows.check(&request).await.unwrap();

        assert_eq!(counter.count(&ip).await.unwrap(), CountOutcome::Counted(2));
        assert_eq!(counter.count(&ip).await.unwrap(), CountOutcome::Counted(2));
    }

    #[tokio::test]
    async fn test_recording_counts_each_lookup() {
        let counter = LocalRequestCounter::recording(windows());
        let ip = ClientIdentity::normalize("192.0.2.2");

        assert_eq!(counter.count(&ip).await.unwrap(), CountOutcome::Counted(1));
        assert_eq!(counter.count(&ip).await.unwrap(), CountOutcome::Counted(2));
    }
}
