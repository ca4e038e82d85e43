//! Application state - shared across all handlers.

use std::sync::Arc;

use tollgate_core::DomainError;
use tollgate_core::ports::{RateLimiter, RequestCounter};
use tollgate_infra::{InMemoryRateLimiter, LocalRequestCounter};

#[cfg(feature = "remote")]
use tollgate_infra::{RemoteCountConfig, RemoteRateLimitConfig, RemoteRateLimiter, RemoteRequestCounter};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Admission backend the gate consults.
    pub limiter: Arc<dyn RateLimiter>,
    pub counter: Arc<dyn RequestCounter>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub fn new(config: &AppConfig) -> Result<Self, DomainError> {
        let windows = Arc::new(InMemoryRateLimiter::new(config.window));

        let remote = Self::remote_limiter(config)?;
        let gate_uses_windows = remote.is_none();
        let limiter: Arc<dyn RateLimiter> = match remote {
            Some(remote) => {
                tracing::info!(policy = ?config.failure_policy, "Remote decision mode enabled");
                remote
            }
            None => {
                tracing::warn!("RATE_LIMIT_URL not set. Using the local window counter only.");
                windows.clone()
            }
        };

        let local_counter = if gate_uses_windows {
            LocalRequestCounter::observing(windows)
        } else {
            LocalRequestCounter::recording(windows)
        };

        #[cfg(feature = "remote")]
        let counter: Arc<dyn RequestCounter> = match &config.count {
            Some(count) => Arc::new(RemoteRequestCounter::new(RemoteCountConfig {
                url: count.url.clone(),
                timeout: count.timeout,
                ..RemoteCountConfig::default()
            })?),
            None => Arc::new(local_counter),
        };

        #[cfg(not(feature = "remote"))]
        let counter: Arc<dyn RequestCounter> = Arc::new(local_counter);

        tracing::info!(
            max_requests = config.window.max_requests,
            window_ms = config.window.window_millis(),
            "Application state initialized"
        );

        Ok(Self { limiter, counter })
    }

    #[cfg(feature = "remote")]
    fn remote_limiter(config: &AppConfig) -> Result<Option<Arc<dyn RateLimiter>>, DomainError> {
        let Some(decision) = &config.decision else {
            return Ok(None);
        };
        let remote = RemoteRateLimiter::new(RemoteRateLimitConfig {
            base_url: decision.base_url.clone(),
            path: decision.path.clone(),
            method: decision.method.parse()?,
            timeout: decision.timeout,
            default_retry_after_secs: decision.default_retry_after_secs,
            debug: config.debug,
        })?;
        Ok(Some(Arc::new(remote)))
    }

    #[cfg(not(feature = "remote"))]
    fn remote_limiter(config: &AppConfig) -> Result<Option<Arc<dyn RateLimiter>>, DomainError> {
        if config.decision.is_some() {
            tracing::warn!("Built without remote feature - ignoring RATE_LIMIT_URL");
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, test, web};

    use crate::handlers::configure_routes;
    use crate::middleware::rate_limit::RateLimitGate;

    fn local_config() -> AppConfig {
        AppConfig::from_lookup(|key| match key {
            "LOCAL_MAX_REQUESTS" => Some("2".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[actix_web::test]
    async fn test_count_reports_gated_requests_and_health_is_ungated() {
        let config = local_config();
        let state = AppState::new(&config).unwrap();
        let gate = RateLimitGate::new(state.limiter.clone(), config.failure_policy);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| configure_routes(cfg, gate)),
        )
        .await;

        let count = || {
            test::TestRequest::get()
                .uri("/api/count")
                .insert_header(("x-forwarded-for", "198.51.100.20"))
                .to_request()
        };

        for n in 1..=2u64 {
            let body: serde_json::Value = test::call_and_read_body_json(&app, count()).await;
            assert_eq!(
                body,
                serde_json::json!({ "ok": true, "ip": "198.51.100.20", "count": n })
            );
        }

        let res = test::call_service(&app, count()).await;
        assert_eq!(res.status(), 429);

        for uri in ["/ping", "/api/health"] {
            let req = test::TestRequest::get()
                .uri(uri)
                .insert_header(("x-forwarded-for", "198.51.100.20"))
                .to_request();
            let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body, serde_json::json!({ "ok": true }));
        }
    }
}
