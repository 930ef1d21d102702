/// API Routes definition

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::static_files;
use crate::App;

pub fn create_router(app: Arc<App>, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/ping", get(handlers::ping));

    let mut router = Router::new()
        .merge(api_routes)
        // Serve the dashboard page - must be last to act as catch-all
        .fallback(static_files::static_handler)
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
