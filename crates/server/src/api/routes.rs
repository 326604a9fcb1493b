use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{convert, download, events, handlers, middleware::metrics_middleware};
use crate::state::AppState;

const BYTES_PER_MB: u64 = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state
        .config()
        .server
        .max_upload_mb
        .saturating_mul(BYTES_PER_MB)
        .try_into()
        .unwrap_or(usize::MAX);

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/capabilities", get(handlers::get_capabilities))
        // Conversion
        .route("/convert", post(convert::convert))
        .route("/jobs", post(convert::submit_job))
        .route("/jobs/{id}", get(convert::get_job))
        .route("/download/{filename}", get(download::download))
        // Events
        .route("/events", get(events::query_events))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
