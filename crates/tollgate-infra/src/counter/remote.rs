//! Remote request counter - asks an external count service for an identity's window count.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use tollgate_core::DomainError;
use tollgate_core::domain::ClientIdentity;
use tollgate_core::ports::{CountError, CountOutcome, RequestCounter};
use tollgate_shared::headers::{CLIENT_IP, RETRY_AFTER};

/// Remote count service configuration.
#[derive(Debug, Clone)]
pub struct RemoteCountConfig {
    pub url: String,
    pub timeout: Duration,
    /// Retry-After used when the count service throttles without one.
    pub default_retry_after_secs: u64,
}

impl Default for RemoteCountConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_millis(1500),
            default_retry_after_secs: 30,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CountPayload {
    #[serde(default)]
    count_in_window: u64,
}

pub struct RemoteRequestCounter {
    client: Client,
    url: String,
    config: RemoteCountConfig,
}

impl RemoteRequestCounter {
    pub fn new(config: RemoteCountConfig) -> Result<Self, DomainError> {
        let url = config.url.trim();
        if url.is_empty() {
            return Err(DomainError::Config {
                key: "COUNT_URL",
                reason: "a count service URL is required".to_string(),
            });
        }
        let url = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{url}/")
        };

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::Config {
                key: "COUNT_URL",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            url,
            config,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RequestCounter for RemoteRequestCounter {
    async fn count(&self, identity: &ClientIdentity) -> Result<CountOutcome, CountError> {
        let response = self
            .client
            .get(&self.url)
            .header(CLIENT_IP, identity.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CountError::Timeout(self.config.timeout)
                } else {
                    CountError::Unreachable(e.to_string())
                }
            })?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(self.config.default_retry_after_secs);
            return Ok(CountOutcome::Limited { retry_after_secs });
        }

        // Unexpected statuses and shapes read as zero rather than failing the page.
        let payload = response.json::<CountPayload>().await.unwrap_or_default();
        Ok(CountOutcome::Counted(payload.count_in_window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn counter(url: String) -> RemoteRequestCounter {
        RemoteRequestCounter::new(RemoteCountConfig {
            url,
            timeout: Duration::from_millis(300),
            default_retry_after_secs: 30,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_reads_count_in_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/count/"))
            .and(header(CLIENT_IP, "198.51.100.4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count_in_window": 4 })))
            .mount(&server)
            .await;

        let counter = counter(format!("{}/count", server.uri()));
        assert!(counter.url().ends_with("/count/"));

        let outcome = counter
            .count(&ClientIdentity::normalize("198.51.100.4"))
            .await
            .unwrap();
        assert_eq!(outcome, CountOutcome::Counted(4));
    }

    #[tokio::test]
    async fn test_throttled_lookup_defaults_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let outcome = counter(server.uri())
            .count(&ClientIdentity::normalize("198.51.100.4"))
            .await
            .unwrap();
        assert_eq!(outcome, CountOutcome::Limited { retry_after_secs: 30 });
    }

    #[tokio::test]
    async fn test_malformed_body_counts_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let outcome = counter(server.uri())
            .count(&ClientIdentity::normalize("198.51.100.4"))
            .await
            .unwrap();
        assert_eq!(outcome, CountOutcome::Counted(0));
    }
}
