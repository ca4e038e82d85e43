//! Admission decisions produced by rate-limit backends.

use serde_json::Value;

use super::identity::ClientIdentity;

/// What a backend needs to know about the request it is judging.
#[derive(Debug, Clone, Copy)]
pub struct DecisionRequest<'a> {
    pub identity: &'a ClientIdentity,
    pub method: &'a str,
    pub path: &'a str,
}

/// Result of an admission check, plus whatever rate-limit metadata the backend knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitVerdict {
    pub admitted: bool,
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Unix epoch seconds at which the current window resets.
    pub reset_epoch: Option<u64>,
    pub retry_after_secs: Option<u64>,
}

impl RateLimitVerdict {
    pub fn admit() -> Self {
        Self {
            admitted: true,
            ..Self::default()
        }
    }

    pub fn deny(retry_after_secs: u64) -> Self {
        Self {
            admitted: false,
            remaining: Some(0),
            retry_after_secs: Some(retry_after_secs),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_remaining(mut self, remaining: Option<u64>) -> Self {
        self.remaining = remaining;
        self
    }

    pub fn with_reset_epoch(mut self, reset_epoch: Option<u64>) -> Self {
        self.reset_epoch = reset_epoch;
        self
    }
}

/// A denied request: the verdict that shapes the 429 headers and the JSON body to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Denial {
    pub verdict: RateLimitVerdict,
    pub body: Value,
}

/// Outcome of asking a backend about one request.
///
/// `Degraded` means the backend answered but not with a usable decision; the
/// caller's failure policy decides what happens next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Admit(RateLimitVerdict),
    Deny(Denial),
    Degraded { status: u16 },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit(_))
    }
}
