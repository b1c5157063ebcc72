use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tryst_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Reports the bot healthy as long as the document store answers.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let store = match state.repo.documents().backend().ping().await {
        Ok(()) => HealthCheck::passed("store"),
        Err(e) => HealthCheck::failed("store", e.to_string()),
    };
    let response = HealthResponse::healthy("tryst-bot", env!("CARGO_PKG_VERSION")).with_checks(vec![store]);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
