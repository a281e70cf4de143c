//! Route table.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Build the application router with permissive CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/search", get(handlers::search))
        .route("/crawl", post(handlers::crawl))
        .route("/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .route("/cache/clear", post(handlers::clear_cache))
        .route("/cache/prewarm", post(handlers::prewarm_cache))
        .route("/cache/optimize", post(handlers::optimize_cache))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
