//! Fixed-window sizing shared by local counters.

use std::time::Duration;

use crate::error::DomainError;

/// Size of a fixed counting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Window duration.
    pub window: Duration,
    /// Requests admitted per window; request `max_requests + 1` is denied.
    pub max_requests: u32,
}

impl WindowConfig {
    pub fn new(window: Duration, max_requests: u32) -> Result<Self, DomainError> {
        if window.is_zero() {
            return Err(DomainError::Validation(
                "window duration must be greater than zero".to_string(),
            ));
        }
        if max_requests == 0 {
            return Err(DomainError::Validation(
                "max requests per window must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            window,
            max_requests,
        })
    }

    pub fn window_millis(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(30_000),
            max_requests: 6,
        }
    }
}
