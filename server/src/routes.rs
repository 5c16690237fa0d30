use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::inbox::routes as inbox;
use crate::inbox::MAX_BODY_BYTES;
use crate::state::AppState;
use crate::viewer::routes as viewer;

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Public ingestion (post token checked by the IngestAuth extractor)
    let inbox_routes = Router::new().route("/inbx", get(inbox::usage).post(inbox::ingest));

    // Viewer routes (Basic auth via the ViewerAuth extractor; token actions also
    // require the anti-forgery token)
    let viewer_routes = Router::new()
        .route("/inbx/view", get(viewer::view_page))
        .route("/inbx/view/{id}", get(viewer::view_entry))
        .route("/inbx/token/generate", post(viewer::generate_token))
        .route("/inbx/token/unset", post(viewer::unset_token));

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(inbox_routes)
        .merge(viewer_routes)
        .merge(health)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
