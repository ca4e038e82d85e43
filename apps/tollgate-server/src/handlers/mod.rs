//! HTTP handlers and route configuration.

mod count;
mod health;

use actix_web::web;

use crate::middleware::rate_limit::RateLimitGate;

/// Configure all application routes.
///
/// Health probes are registered outside the gated scope so they are never throttled.
pub fn configure_routes(cfg: &mut web::ServiceConfig, gate: RateLimitGate) {
    cfg.route("/ping", web::get().to(health::health_check))
        .route("/api/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .wrap(gate)
                .route("/count", web::get().to(count::count)),
        );
}
