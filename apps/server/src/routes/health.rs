use actix_web::{http::StatusCode, web, HttpResponse};
use serde::Serialize;

use crate::services::ImageGenerator;

#[derive(Serialize)]
pub struct LivenessResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    generator: &'static str,
}

/// Liveness check - is the process running?
/// Returns 200 if the server is alive.
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(LivenessResponse { status: "ok" })
}

/// Readiness check - can the service generate cards?
/// Returns 200 if the generator is configured, 503 otherwise.
pub async fn readiness(generator: web::Data<dyn ImageGenerator>) -> HttpResponse {
    let (status, generator_status, http_status) = if generator.is_configured() {
        ("ready", "ok", StatusCode::OK)
    } else {
        ("not_ready", "missing_api_key", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = ReadinessResponse {
        status,
        checks: ReadinessChecks {
            generator: generator_status,
        },
    };

    HttpResponse::build(http_status).json(response)
}

/// Registers the health routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(liveness))
            .route("/ready", web::get().to(readiness)),
    )
    // Root health check alias
    .route("/health", web::get().to(liveness));
}
