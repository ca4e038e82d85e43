//! In-memory fixed-window rate limiter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tollgate_core::domain::{
    ClientIdentity, Decision, DecisionRequest, Denial, RateLimitVerdict, WindowConfig,
};
use tollgate_core::ports::{Clock, RateLimitError, RateLimiter, SystemClock};
use tollgate_shared::LocalDenialBody;

/// Per-identity window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    pub count: u32,
    pub window_start_ms: u64,
}

impl WindowRecord {
    fn expired(&self, window_ms: u64, now_ms: u64) -> bool {
        now_ms >= self.window_start_ms.saturating_add(window_ms) || now_ms < self.window_start_ms
    }
}

/// Fixed-window counter keyed by client identity.
///
/// Pure state: every method takes the current time, so callers (and tests)
/// decide what "now" is. Stale records are overwritten on the next hit and
/// never swept.
#[derive(Debug, Default)]
pub struct WindowCounter {
    config: WindowConfig,
    records: HashMap<String, WindowRecord>,
}

impl WindowCounter {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
        }
    }

    /// Count one request and return the record as it stands afterwards.
    pub fn hit(&mut self, identity: &ClientIdentity, now_ms: u64) -> WindowRecord {
        let window_ms = self.config.window_millis();
        let record = self
            .records
            .entry(identity.as_str().to_string())
            .or_insert(WindowRecord {
                count: 0,
                window_start_ms: now_ms,
            });

        if record.count == 0 || record.expired(window_ms, now_ms) {
            *record = WindowRecord {
                count: 1,
                window_start_ms: now_ms,
            };
        } else {
            record.count = record.count.saturating_add(1);
        }

        *record
    }

    /// Count one request and decide whether it is admitted.
    pub fn check(&mut self, identity: &ClientIdentity, now_ms: u64) -> RateLimitVerdict {
        let record = self.hit(identity, now_ms);
        let max = self.config.max_requests;
        let resets_at_ms = record
            .window_start_ms
            .saturating_add(self.config.window_millis());
        let limit = Some(u64::from(max));
        let reset_epoch = Some(resets_at_ms.div_ceil(1000));

        if record.count <= max {
            RateLimitVerdict::admit()
                .with_limit(limit)
                .with_remaining(Some(u64::from(max - record.count)))
                .with_reset_epoch(reset_epoch)
        } else {
            let retry_after = resets_at_ms.saturating_sub(now_ms).div_ceil(1000);
            RateLimitVerdict::deny(retry_after)
                .with_limit(limit)
                .with_reset_epoch(reset_epoch)
        }
    }

    /// Requests counted for `identity` in its live window, without counting this call.
    pub fn current_count(&self, identity: &ClientIdentity, now_ms: u64) -> u32 {
        self.records
            .get(identity.as_str())
            .filter(|record| !record.expired(self.config.window_millis(), now_ms))
            .map(|record| record.count)
            .unwrap_or(0)
    }
}

/// In-memory rate limiter - the fallback when no decision service is configured.
///
/// Note: Limits are per-process, not shared across instances, and are lost on restart.
pub struct InMemoryRateLimiter {
    counter: Mutex<WindowCounter>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    pub fn new(config: WindowConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: WindowConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            counter: Mutex::new(WindowCounter::new(config)),
            clock,
        }
    }

    /// Count one request outside of an admission check.
    pub async fn record(&self, identity: &ClientIdentity) -> u32 {
        let now = self.clock.now_millis();
        self.counter.lock().await.hit(identity, now).count
    }

    pub async fn current_count(&self, identity: &ClientIdentity) -> u32 {
        let now = self.clock.now_millis();
        self.counter.lock().await.current_count(identity, now)
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, request: &DecisionRequest<'_>) -> Result<Decision, RateLimitError> {
        let now = self.clock.now_millis();
        // The lock spans the whole read-modify-write so concurrent requests
        // from one identity cannot both slip under the limit.
        let verdict = self.counter.lock().await.check(request.identity, now);

        if verdict.admitted {
            return Ok(Decision::Admit(verdict));
        }

        let retry_after = verdict.retry_after_secs.unwrap_or(1);
        tracing::debug!(
            identity = %request.identity,
            retry_after,
            "Local window exhausted"
        );
        let body = serde_json::to_value(LocalDenialBody::new(retry_after)).unwrap_or_default();
        Ok(Decision::Deny(Denial { verdict, body }))
    }
}
