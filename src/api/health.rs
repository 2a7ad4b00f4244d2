use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use tracing::error;

use crate::engine::CompletionLedger;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    ledger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Check the completion ledger. The in-memory ledger is always reachable.
async fn check_ledger(ledger: &CompletionLedger) -> Result<(), sqlx::Error> {
    match ledger {
        CompletionLedger::Memory(_) => Ok(()),
        CompletionLedger::Postgres(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.map(|_| ()),
    }
}

/// Health check endpoint
///
/// General health check including ledger connectivity.
/// Use for load balancers and uptime monitors.
#[get("/health")]
async fn health_check(ledger: web::Data<CompletionLedger>) -> impl Responder {
    match check_ledger(ledger.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(HealthResponse {
            status: "healthy".to_string(),
            ledger: ledger.backend().to_string(),
            error: None,
        }),
        Err(e) => {
            error!("Health check failed: {:?}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "unhealthy".to_string(),
                ledger: ledger.backend().to_string(),
                error: Some(format!("Database error: {}", e)),
            })
        }
    }
}

/// Readiness check endpoint
///
/// Returns 503 while the ledger is unreachable; completions cannot be
/// recorded until it returns.
#[get("/ready")]
async fn readiness_check(ledger: web::Data<CompletionLedger>) -> impl Responder {
    match check_ledger(ledger.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(HealthResponse {
            status: "ready".to_string(),
            ledger: ledger.backend().to_string(),
            error: None,
        }),
        Err(e) => {
            error!("Readiness check failed: ledger unavailable: {:?}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "not_ready".to_string(),
                ledger: ledger.backend().to_string(),
                error: Some(format!("Ledger unavailable: {}", e)),
            })
        }
    }
}

/// Liveness check endpoint
///
/// Simple check that the process is alive. Does not check dependencies.
#[get("/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "alive".to_string(),
        ledger: "not_checked".to_string(),
        error: None,
    })
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn in_memory_ledger_is_healthy() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(CompletionLedger::in_memory()))
                .configure(health_config),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["ledger"], "memory");

        let req = test::TestRequest::get().uri("/live").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
}
