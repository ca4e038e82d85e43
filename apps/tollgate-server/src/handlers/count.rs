//! Request count endpoint.

use actix_web::{HttpResponse, web};

use tollgate_core::ports::CountOutcome;
use tollgate_shared::dto::{CountLimitedResponse, CountResponse};
use tollgate_shared::headers::RETRY_AFTER;

use crate::middleware::client_ip::ClientIp;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/count
pub async fn count(state: web::Data<AppState>, ClientIp(identity): ClientIp) -> AppResult<HttpResponse> {
    match state.counter.count(&identity).await? {
        CountOutcome::Counted(count) => {
            Ok(HttpResponse::Ok().json(CountResponse::new(identity.as_str(), count)))
        }
        CountOutcome::Limited { retry_after_secs } => {
            tracing::warn!(identity = %identity, retry_after_secs, "Count service throttled lookup");
            Ok(HttpResponse::TooManyRequests()
                .insert_header((RETRY_AFTER, retry_after_secs.to_string()))
                .json(CountLimitedResponse {
                    error: "Too Many Requests".to_string(),
                    retry_after: retry_after_secs,
                    ip: identity.to_string(),
                }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, test};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    use tollgate_core::domain::{ClientIdentity, WindowConfig};
    use tollgate_core::ports::{CountError, RequestCounter};
    use tollgate_infra::InMemoryRateLimiter;

    struct Scripted(fn() -> Result<CountOutcome, CountError>);

    #[async_trait]
    impl RequestCounter for Scripted {
        async fn count(&self, _identity: &ClientIdentity) -> Result<CountOutcome, CountError> {
            (self.0)()
        }
    }

    async fn call(counter: Scripted) -> actix_web::dev::ServiceResponse {
        let state = AppState {
            limiter: Arc::new(InMemoryRateLimiter::new(WindowConfig::default())),
            counter: Arc::new(counter),
        };
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/api/count", web::get().to(count)),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/count")
            .insert_header(("x-forwarded-for", "::ffff:192.0.2.7"))
            .to_request();
        test::call_service(&app, req).await
    }

    #[actix_web::test]
    async fn test_counted() {
        let res = call(Scripted(|| Ok(CountOutcome::Counted(4)))).await;
        assert_eq!(res.status(), 200);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body, serde_json::json!({ "ok": true, "ip": "192.0.2.7", "count": 4 }));
    }

    #[actix_web::test]
    async fn test_limited_lookup_is_relayed_as_429() {
        let res = call(Scripted(|| {
            Ok(CountOutcome::Limited {
                retry_after_secs: 30,
            })
        }))
        .await;

        assert_eq!(res.status(), 429);
        assert_eq!(
            res.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()),
            Some("30")
        );
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(
            body,
            serde_json::json!({ "error": "Too Many Requests", "retryAfter": 30, "ip": "192.0.2.7" })
        );
    }

    #[actix_web::test]
    async fn test_lookup_failure_is_500() {
        let res = call(Scripted(|| {
            Err(CountError::Timeout(Duration::from_millis(1500)))
        }))
        .await;

        assert_eq!(res.status(), 500);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body, serde_json::json!({ "error": "count lookup failed" }));
    }
}
