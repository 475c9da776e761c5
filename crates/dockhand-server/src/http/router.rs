//! Axum router configuration with middleware.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/services",
            post(handlers::create_service).get(handlers::list_services),
        )
        .route(
            "/services/{name}",
            get(handlers::get_service).delete(handlers::remove_service),
        )
        .route("/services/{name}/start", post(handlers::start_service))
        .route("/services/{name}/deploy", put(handlers::deploy_service))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
