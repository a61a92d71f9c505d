use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                // Individual stages
                .route("/generate", post(handlers::api::generate_query))
                .route("/execute", post(handlers::api::execute_query))
                .route("/explain", post(handlers::api::explain_query))
                .route("/chart", post(handlers::api::chart_config))
                // Question to chart in one call
                .route("/ask", post(handlers::api::ask))
                .route("/status", get(handlers::api::system_status)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
