//! Health check endpoint.

use actix_web::HttpResponse;

use tollgate_shared::dto::HealthResponse;

/// Liveness probe - no side effects, never rate limited.
///
/// GET /ping, GET /api/health
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse { ok: true })
}
