//! Client configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server base URL, without a trailing slash.
    pub api_base: String,
    /// Where the block record is persisted between runs.
    pub state_file: PathBuf,
    /// Wait applied when a 429 carries no usable `Retry-After`.
    pub default_retry_after_secs: u64,
    /// Re-issue the request once a wait runs out instead of stopping.
    pub auto_retry: bool,
    pub rounds: u32,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:3001".to_string(),
            state_file: PathBuf::from(".tollgate-block.json"),
            default_retry_after_secs: 5,
            auto_retry: false,
            rounds: 1,
            timeout: Duration::from_millis(5_000),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            api_base: get("TOLLGATE_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            state_file: get("TOLLGATE_STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_file),
            default_retry_after_secs: get("TOLLGATE_DEFAULT_RETRY_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_retry_after_secs),
            auto_retry: get("TOLLGATE_AUTO_RETRY")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.auto_retry),
            rounds: get("TOLLGATE_ROUNDS")
                .and_then(|v| v.parse().ok())
                .filter(|rounds| *rounds > 0)
                .unwrap_or(defaults.rounds),
            timeout: get("TOLLGATE_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn count_url(&self) -> String {
        format!("{}/api/count", self.api_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.count_url(), "http://127.0.0.1:3001/api/count");
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(|key| {
            match key {
                "TOLLGATE_API_BASE" => Some("https://gate.example.com/"),
                "TOLLGATE_AUTO_RETRY" => Some("true"),
                "TOLLGATE_ROUNDS" => Some("0"),
                "TOLLGATE_DEFAULT_RETRY_SECS" => Some("9"),
                _ => None,
            }
            .map(str::to_string)
        });

        assert_eq!(config.count_url(), "https://gate.example.com/api/count");
        assert!(config.auto_retry);
        assert_eq!(config.rounds, 1);
        assert_eq!(config.default_retry_after_secs, 9);
    }
}
