use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;
use tracing::warn;

use crate::server::app_state::AppState;

/// HTTP health check endpoint
pub async fn health_check(app_state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let storage_ok = match app_state.accounts.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!("Account store health check failed: {}", e);
            false
        }
    };

    let status = if storage_ok { "healthy" } else { "degraded" };
    let body = json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "account_store": storage_ok,
            "environment": format!("{:?}", app_state.config.environment),
        }
    });

    if storage_ok {
        Ok(HttpResponse::Ok().json(body))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(body))
    }
}

/// HTTP liveness check endpoint
pub async fn liveness_check() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
