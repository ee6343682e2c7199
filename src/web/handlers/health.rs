//! Health check handler.

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::HealthResponse;

/// Service version reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GET /health - Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: VERSION.to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}
