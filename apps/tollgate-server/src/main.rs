//! # Tollgate API Server
//!
//! Actix-web server that puts a per-IP rate-limit gate in front of the count API.

use actix_cors::Cors;
use actix_web::http::{Method, header};
use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::rate_limit::RateLimitGate;
use state::AppState;
use telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env files if present
    dotenvy::dotenv().ok();
    dotenvy::from_filename(".env.local").ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    tracing::info!(
        "Starting Tollgate API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config).map_err(std::io::Error::other)?;
    let gate = RateLimitGate::new(state.limiter.clone(), config.failure_policy);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allowed_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        App::new()
            .wrap(cors)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, gate.clone()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
