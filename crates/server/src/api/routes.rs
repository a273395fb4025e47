use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, renders};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let outputs_dir = state.config().storage.outputs_dir();
    let max_upload_bytes = state.config().server.max_upload_bytes;

    // API routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Renders
        .route("/render", post(renders::submit_render))
        .route("/render/{id}", get(renders::get_render))
        .route("/renders", get(renders::list_renders))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics))
        // Finished loops and fallback screenshots
        .nest_service("/files/outputs", ServeDir::new(outputs_dir))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
