//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tollgate_core::DomainError;
use tollgate_core::domain::WindowConfig;

use crate::middleware::rate_limit::FailurePolicy;

/// Remote decision service settings. Present only when `RATE_LIMIT_URL` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionServiceConfig {
    pub base_url: String,
    pub path: String,
    pub method: String,
    pub timeout: Duration,
    pub default_retry_after_secs: u64,
}

/// Remote count service settings. Present only when `COUNT_URL` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountServiceConfig {
    pub url: String,
    pub timeout: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub decision: Option<DecisionServiceConfig>,
    pub count: Option<CountServiceConfig>,
    pub failure_policy: FailurePolicy,
    /// Log every decision round-trip.
    pub debug: bool,
    pub window: WindowConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |key: &'static str, default: u64| -> Result<u64, DomainError> {
            Ok(get(key)
                .map(|s| parse_key(key, &s))
                .transpose()?
                .unwrap_or(default))
        };
        let flag = |key: &str| {
            get(key)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        let decision = match get("RATE_LIMIT_URL") {
            Some(base_url) => Some(DecisionServiceConfig {
                base_url,
                path: get("RATE_LIMIT_PATH").unwrap_or_default(),
                method: get("RATE_LIMIT_METHOD").unwrap_or_else(|| "POST".to_string()),
                timeout: Duration::from_millis(parsed("RATE_LIMIT_TIMEOUT_MS", 1500)?),
                default_retry_after_secs: parsed("RATE_LIMIT_DEFAULT_RETRY_SECS", 30)?,
            }),
            None => None,
        };

        let count = match get("COUNT_URL") {
            Some(url) => Some(CountServiceConfig {
                url,
                timeout: Duration::from_millis(parsed("COUNT_TIMEOUT_MS", 1500)?),
            }),
            None => None,
        };

        let failure_policy = if flag("RATE_LIMIT_FAIL_OPEN") {
            FailurePolicy::Open
        } else {
            FailurePolicy::Closed
        };

        let max_requests = get("LOCAL_MAX_REQUESTS")
            .map(|s| parse_key("LOCAL_MAX_REQUESTS", &s))
            .transpose()?
            .unwrap_or(6);
        let window = WindowConfig::new(
            Duration::from_millis(parsed("LOCAL_WINDOW_MS", 30_000)?),
            max_requests,
        )?;

        let port = get("PORT")
            .map(|s| parse_key("PORT", &s))
            .transpose()?
            .unwrap_or(3001);

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            decision,
            count,
            failure_policy,
            debug: flag("RATE_LIMIT_DEBUG"),
            window,
        })
    }
}

fn parse_key<T: FromStr>(key: &'static str, value: &str) -> Result<T, DomainError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| DomainError::Config {
        key,
        reason: format!("{value:?}: {e}"),
    })
}
