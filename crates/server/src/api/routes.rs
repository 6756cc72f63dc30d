use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware, milestones};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Pipeline intelligence
        .route("/intelligence", get(milestones::get_intelligence))
        // Milestone RPC surface
        .route("/milestones/{kind}/activate", post(milestones::activate))
        .route(
            "/milestones/{kind}/intelligence",
            post(milestones::publish_intelligence),
        )
        .route("/milestones/{kind}/keepalive", post(milestones::keepalive))
        // Worker log transcript
        .route("/logs", post(milestones::append_log))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(axum_middleware::from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
