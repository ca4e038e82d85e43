//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// `GET /api/count` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub ok: bool,
    pub ip: String,
    pub count: u64,
}

impl CountResponse {
    pub fn new(ip: impl Into<String>, count: u64) -> Self {
        Self {
            ok: true,
            ip: ip.into(),
            count,
        }
    }
}

/// `GET /api/count` body when the count service itself is throttling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountLimitedResponse {
    pub error: String,
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
    pub ip: String,
}

/// Liveness probe body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}
