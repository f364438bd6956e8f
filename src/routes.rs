// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::post,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{render, sanitize},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Mounts the field rendering and sanitizing endpoints.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (shared Sanitizer).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let field_routes = Router::new().route("/render", post(render::render_field));

    Router::new()
        .nest("/api/fields", field_routes)
        .route("/api/sanitize", post(sanitize::sanitize_html))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
