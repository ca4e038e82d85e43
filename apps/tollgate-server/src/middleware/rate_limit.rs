//! Rate limiting middleware - the gate in front of every protected route.

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderMap, HeaderName, HeaderValue},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use tollgate_core::domain::{Decision, DecisionRequest, Denial, RateLimitVerdict};
use tollgate_core::ports::{RateLimitError, RateLimiter};
use tollgate_shared::ErrorBody;
use tollgate_shared::headers::{
    RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET, RETRY_AFTER,
};

use super::client_ip::{ClientIp, resolve_identity};

/// What to do with a request when the decision service cannot decide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Let the request through unchecked.
    Open,
    /// Reject with 503.
    #[default]
    Closed,
}

/// What the gate does with one request.
#[derive(Debug)]
enum Outcome {
    /// Call the protected handler; attach the verdict's metadata when known.
    Forward(Option<RateLimitVerdict>),
    Reject(HttpResponse),
}

impl Outcome {
    fn decide(decision: Result<Decision, RateLimitError>, policy: FailurePolicy) -> Self {
        match decision {
            Ok(Decision::Admit(verdict)) => Outcome::Forward(Some(verdict)),
            Ok(Decision::Deny(denial)) => Outcome::Reject(too_many_requests(&denial)),
            Ok(Decision::Degraded { status }) => {
                tracing::warn!(status, ?policy, "Decision service degraded");
                Self::on_failure(policy, ErrorBody::check_unavailable())
            }
            Err(e) => {
                tracing::error!(error = %e, ?policy, "Decision service unreachable");
                Self::on_failure(policy, ErrorBody::check_failed())
            }
        }
    }

    fn on_failure(policy: FailurePolicy, body: ErrorBody) -> Self {
        match policy {
            FailurePolicy::Open => Outcome::Forward(None),
            FailurePolicy::Closed => Outcome::Reject(HttpResponse::ServiceUnavailable().json(body)),
        }
    }
}

/// Build the 429 for a denial.
fn too_many_requests(denial: &Denial) -> HttpResponse {
    let verdict = &denial.verdict;
    let mut response = HttpResponse::TooManyRequests();

    if let Some(retry_after) = verdict.retry_after_secs {
        response.insert_header((RETRY_AFTER, retry_after.to_string()));
    }
    if let Some(limit) = verdict.limit {
        response.insert_header((RATE_LIMIT_LIMIT, limit.to_string()));
    }
    response.insert_header((RATE_LIMIT_REMAINING, "0"));
    if let Some(reset) = verdict.reset_epoch {
        response.insert_header((RATE_LIMIT_RESET, reset.to_string()));
    }

    response.json(&denial.body)
}

/// Copy the known rate-limit metadata of an admitted request onto its response.
fn insert_admission_headers(headers: &mut HeaderMap, verdict: &RateLimitVerdict) {
    let fields = [
        (RATE_LIMIT_LIMIT, verdict.limit),
        (RATE_LIMIT_REMAINING, verdict.remaining),
        (RATE_LIMIT_RESET, verdict.reset_epoch),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
        }
    }
}

/// Rate limiting middleware factory.
///
/// Denials never reach the wrapped service. The failure policy only applies
/// when the backend could not decide.
#[derive(Clone)]
pub struct RateLimitGate {
    limiter: Arc<dyn RateLimiter>,
    policy: FailurePolicy,
}

impl RateLimitGate {
    pub fn new(limiter: Arc<dyn RateLimiter>, policy: FailurePolicy) -> Self {
        Self { limiter, policy }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitGateService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            policy: self.policy,
        }))
    }
}

pub struct RateLimitGateService<S> {
    service: Rc<S>,
    limiter: Arc<dyn RateLimiter>,
    policy: FailurePolicy,
}

impl<S, B> Service<ServiceRequest> for RateLimitGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = self.limiter.clone();
        let policy = self.policy;

        let identity = resolve_identity(req.request());
        let method = req.method().to_string();
        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());

        Box::pin(async move {
            let decision = limiter
                .check(&DecisionRequest {
                    identity: &identity,
                    method: &method,
                    path: &path,
                })
                .await;

            match Outcome::decide(decision, policy) {
                Outcome::Forward(verdict) => {
                    req.extensions_mut().insert(ClientIp(identity));
                    let mut res = service.call(req).await?;
                    if let Some(verdict) = verdict {
                        insert_admission_headers(res.headers_mut(), &verdict);
                    }
                    Ok(res.map_into_left_body())
                }
                Outcome::Reject(response) => {
                    if response.status().as_u16() == 429 {
                        tracing::warn!(identity = %identity, path = %path, "Rate limit exceeded");
                    }
                    let (http_req, _payload) = req.into_parts();
                    let srv_response = ServiceResponse::new(http_req, response);
                    Ok(srv_response.map_into_right_body())
                }
            }
        })
    }
}
