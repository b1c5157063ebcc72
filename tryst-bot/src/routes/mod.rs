//! HTTP surface next to the bot: health, Prometheus metrics and the admin
//! moderation API.

pub mod admin;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tryst_shared::middleware::metrics_middleware;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/pending", get(admin::list_pending))
        .route("/pending/:id/approve", post(admin::approve))
        .route("/pending/:id/decline", post(admin::decline))
        .route("/stats", get(admin::stats));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
