//! Response bodies emitted by the gate.

use serde::{Deserialize, Serialize};

/// Denial body synthesized when the decision service did not send a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    pub remaining: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_epoch: Option<u64>,
}

impl DenialBody {
    pub fn too_many_requests(limit: Option<u64>, reset_epoch: Option<u64>) -> Self {
        Self {
            message: "Too Many Requests".to_string(),
            limit,
            remaining: 0,
            reset_epoch,
        }
    }
}

/// Denial body produced by the in-process window counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDenialBody {
    pub error: String,
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
}

impl LocalDenialBody {
    pub fn new(retry_after: u64) -> Self {
        Self {
            error: "Too many refreshes".to_string(),
            retry_after,
        }
    }
}

/// Plain `{ "error": ... }` body used for 5xx outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// The decision service answered with something other than a decision.
    pub fn check_unavailable() -> Self {
        Self::new("RateLimit check unavailable")
    }

    /// The decision service could not be reached.
    pub fn check_failed() -> Self {
        Self::new("RateLimit check failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_denial_body_omits_unknown_metadata() {
        let body = serde_json::to_value(DenialBody::too_many_requests(None, Some(1_700_000_000)))
            .unwrap();
        assert_eq!(
            body,
            json!({ "message": "Too Many Requests", "remaining": 0, "reset_epoch": 1_700_000_000u64 })
        );
    }

    #[test]
    fn test_local_denial_uses_camel_case_retry() {
        let body = serde_json::to_value(LocalDenialBody::new(7)).unwrap();
        assert_eq!(body, json!({ "error": "Too many refreshes", "retryAfter": 7 }));
    }
}
