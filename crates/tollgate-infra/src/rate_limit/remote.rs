//! Remote decision client - delegates admission to an external rate-limit service.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use tollgate_core::DomainError;
use tollgate_core::domain::{Decision, DecisionRequest, Denial, RateLimitVerdict};
use tollgate_core::ports::{RateLimitError, RateLimiter};
use tollgate_shared::DenialBody;
use tollgate_shared::headers::{
    CLIENT_IP, ORIGINAL_METHOD, ORIGINAL_PATH, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING,
    RATE_LIMIT_RESET, RETRY_AFTER,
};

/// HTTP method used to call the decision endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMethod {
    Get,
    Post,
}

impl FromStr for DecisionMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(DomainError::Config {
                key: "RATE_LIMIT_METHOD",
                reason: format!("expected GET or POST, got {other:?}"),
            }),
        }
    }
}

/// Remote decision service configuration.
#[derive(Debug, Clone)]
pub struct RemoteRateLimitConfig {
    /// Base URL of the decision service.
    pub base_url: String,
    /// Path appended verbatim to `base_url`.
    pub path: String,
    pub method: DecisionMethod,
    /// Hard limit on one decision round-trip.
    pub timeout: Duration,
    /// Retry-After used when a denial does not carry one.
    pub default_retry_after_secs: u64,
    /// Log every decision request and response.
    pub debug: bool,
}

impl Default for RemoteRateLimitConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            path: "/api/test".to_string(),
            method: DecisionMethod::Get,
            timeout: Duration::from_millis(1200),
            default_retry_after_secs: 30,
            debug: false,
        }
    }
}

impl RemoteRateLimitConfig {
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }
}

/// Rate-limit metadata read off a decision response.
#[derive(Debug, Default)]
struct ResponseMeta {
    limit: Option<u64>,
    remaining: Option<u64>,
    reset: Option<u64>,
    retry_after: Option<u64>,
    remaining_is_zero: bool,
    has_retry_after: bool,
}

impl ResponseMeta {
    fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        };
        let number = |name: &str| text(name).and_then(|v| v.parse::<u64>().ok());

        Self {
            limit: number(RATE_LIMIT_LIMIT),
            remaining: number(RATE_LIMIT_REMAINING),
            reset: number(RATE_LIMIT_RESET),
            retry_after: number(RETRY_AFTER),
            remaining_is_zero: text(RATE_LIMIT_REMAINING) == Some("0"),
            has_retry_after: headers.contains_key(RETRY_AFTER),
        }
    }
}

/// Rate limiter backed by a remote decision service.
///
/// Never fails on an HTTP status: 2xx admits, rate-limit signals deny, anything
/// else is reported as [`Decision::Degraded`]. Only transport problems are errors.
pub struct RemoteRateLimiter {
    client: Client,
    config: RemoteRateLimitConfig,
    endpoint: String,
}

impl RemoteRateLimiter {
    pub fn new(config: RemoteRateLimitConfig) -> Result<Self, DomainError> {
        if config.base_url.trim().is_empty() {
            return Err(DomainError::Config {
                key: "RATE_LIMIT_URL",
                reason: "a decision service base URL is required".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::Config {
                key: "RATE_LIMIT_URL",
                reason: e.to_string(),
            })?;
        let endpoint = config.endpoint();

        tracing::info!(endpoint = %endpoint, method = ?config.method, "Remote rate limiter configured");

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> RateLimitError {
        if err.is_timeout() {
            RateLimitError::Timeout(self.config.timeout)
        } else {
            RateLimitError::Unreachable(err.to_string())
        }
    }

    /// Forward a structured body verbatim, otherwise synthesize one.
    fn denial_body(bytes: &[u8], meta: &ResponseMeta) -> Value {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(body @ Value::Object(_)) => body,
            _ => serde_json::to_value(DenialBody::too_many_requests(meta.limit, meta.reset))
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl RateLimiter for RemoteRateLimiter {
    async fn check(&self, request: &DecisionRequest<'_>) -> Result<Decision, RateLimitError> {
        let debug = self.config.debug;
        if debug {
            tracing::info!(
                endpoint = %self.endpoint,
                identity = %request.identity,
                method = request.method,
                path = request.path,
                "Decision request"
            );
        }

        let builder = match self.config.method {
            DecisionMethod::Get => self.client.get(&self.endpoint),
            DecisionMethod::Post => self.client.post(&self.endpoint).json(&serde_json::json!({})),
        };
        let response = builder
            .header(CLIENT_IP, request.identity.as_str())
            .header(ORIGINAL_METHOD, request.method)
            .header(ORIGINAL_PATH, request.path)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let meta = ResponseMeta::from_headers(response.headers());

        if debug {
            tracing::info!(
                status = status.as_u16(),
                limit = ?meta.limit,
                remaining = ?meta.remaining,
                reset = ?meta.reset,
                retry_after = ?meta.retry_after,
                "Decision response"
            );
        }

        if status.is_success() {
            return Ok(Decision::Admit(
                RateLimitVerdict::admit()
                    .with_limit(meta.limit)
                    .with_remaining(meta.remaining)
                    .with_reset_epoch(meta.reset),
            ));
        }

        let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
            || meta.remaining_is_zero
            || meta.has_retry_after;

        if !rate_limited {
            return Ok(Decision::Degraded {
                status: status.as_u16(),
            });
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read denial body, synthesizing one");
                Default::default()
            }
        };
        let body = Self::denial_body(&bytes, &meta);
        let retry_after = meta
            .retry_after
            .unwrap_or(self.config.default_retry_after_secs);

        Ok(Decision::Deny(Denial {
            verdict: RateLimitVerdict::deny(retry_after)
                .with_limit(meta.limit)
                .with_reset_epoch(meta.reset),
            body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tollgate_core::domain::ClientIdentity;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn limiter(server: &MockServer, method: DecisionMethod) -> RemoteRateLimiter {
        RemoteRateLimiter::new(RemoteRateLimitConfig {
            base_url: server.uri(),
            path: "/decide".to_string(),
            method,
            timeout: Duration::from_millis(300),
            default_retry_after_secs: 30,
            debug: true,
        })
        .unwrap()
    }

    async fn decide(limiter: &RemoteRateLimiter) -> Result<Decision, RateLimitError> {
        let identity = ClientIdentity::normalize("203.0.113.5");
        limiter
            .check(&DecisionRequest {
                identity: &identity,
                method: "GET",
                path: "/api/count",
            })
            .await
    }

    #[tokio::test]
    async fn test_success_admits_and_copies_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/decide"))
            .and(header(CLIENT_IP, "203.0.113.5"))
            .and(header(ORIGINAL_METHOD, "GET"))
            .and(header(ORIGINAL_PATH, "/api/count"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(RATE_LIMIT_LIMIT, "10")
                    .insert_header(RATE_LIMIT_REMAINING, "3")
                    .insert_header(RATE_LIMIT_RESET, "1700000030"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let decision = decide(&limiter(&server, DecisionMethod::Post)).await.unwrap();

        assert_eq!(
            decision,
            Decision::Admit(RateLimitVerdict {
                admitted: true,
                limit: Some(10),
                remaining: Some(3),
                reset_epoch: Some(1_700_000_030),
                retry_after_secs: None,
            })
        );
    }

    #[tokio::test]
    async fn test_429_passes_structured_body_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header(RETRY_AFTER, "12")
                    .set_body_json(json!({ "message": "slow down", "bucket": "ip" })),
            )
            .mount(&server)
            .await;

        match decide(&limiter(&server, DecisionMethod::Get)).await.unwrap() {
            Decision::Deny(denial) => {
                assert_eq!(denial.verdict.retry_after_secs, Some(12));
                assert_eq!(denial.body, json!({ "message": "slow down", "bucket": "ip" }));
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_remaining_denies_with_synthesized_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header(RATE_LIMIT_LIMIT, "5")
                    .insert_header(RATE_LIMIT_REMAINING, "0")
                    .set_body_string("blocked"),
            )
            .mount(&server)
            .await;

        match decide(&limiter(&server, DecisionMethod::Get)).await.unwrap() {
            Decision::Deny(denial) => {
                assert_eq!(denial.verdict.retry_after_secs, Some(30));
                assert_eq!(
                    denial.body,
                    json!({ "message": "Too Many Requests", "limit": 5, "remaining": 0 })
                );
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retry_after_alone_signals_denial() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).insert_header(RETRY_AFTER, "7"))
            .mount(&server)
            .await;

        let decision = decide(&limiter(&server, DecisionMethod::Get)).await.unwrap();
        assert!(matches!(
            decision,
            Decision::Deny(Denial { verdict: RateLimitVerdict { retry_after_secs: Some(7), .. }, .. })
        ));
    }

    #[tokio::test]
    async fn test_other_status_is_degraded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let decision = decide(&limiter(&server, DecisionMethod::Get)).await.unwrap();
        assert_eq!(decision, Decision::Degraded { status: 502 });
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = decide(&limiter(&server, DecisionMethod::Get)).await.unwrap_err();
        assert!(matches!(err, RateLimitError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let limiter = RemoteRateLimiter::new(RemoteRateLimitConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..RemoteRateLimitConfig::default()
        })
        .unwrap();

        let err = decide(&limiter).await.unwrap_err();
        assert!(matches!(err, RateLimitError::Unreachable(_)), "got {err:?}");
    }

    #[test]
    fn test_requires_base_url() {
        assert!(RemoteRateLimiter::new(RemoteRateLimitConfig::default()).is_err());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("post".parse::<DecisionMethod>().unwrap(), DecisionMethod::Post);
        assert_eq!(" GET ".parse::<DecisionMethod>().unwrap(), DecisionMethod::Get);
        assert!("PUT".parse::<DecisionMethod>().is_err());
    }
}
