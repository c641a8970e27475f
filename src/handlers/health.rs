use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use utoipa::ToSchema;

use crate::gateway::StoreStats;
use crate::models::response::{ApiResponse, ErrorResponse};
use crate::session::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    pub status: String,
    pub database: String,
    pub stats: StoreStats,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    )
)]
pub async fn service_info() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ServiceInfo {
        name: "Todo Backend API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "REST API deriving filtered, sorted and grouped todo views".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Store reachable", body = ApiResponse<HealthReport>),
        (status = 503, description = "Store unreachable", body = ErrorResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.gateway.stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            "Todo Backend API is running",
            HealthReport {
                status: "ok".to_string(),
                database: "connected".to_string(),
                stats,
            },
        ))),
        Err(e) => {
            log::error!("Store health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(ErrorResponse::new("Database connection failed")))
        }
    }
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(service_info))
        .route("/health", web::get().to(health_check));
}
