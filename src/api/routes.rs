//! API Routes
//!
//! Configures the Axum router with all cache admin endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, exists_handler, get_handler, health_handler, remove_by_pattern_handler,
    remove_handler, set_handler, AppState,
};
use crate::connection::ConnectionProvider;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /cache/entries/:key` - Read a value (null when missing)
/// - `GET /cache/entries/:key/exists` - Check presence in either tier
/// - `PUT /cache/entries` - Store a value with optional cache time
/// - `DELETE /cache/entries/:key` - Remove a key (reserved key is kept)
/// - `POST /cache/remove-by-pattern` - Remove keys containing a pattern
/// - `POST /cache/clear` - Remove everything but the reserved key
/// - `GET /health` - Store reachability
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router<P: ConnectionProvider>(state: AppState<P>) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache/entries", put(set_handler::<P>))
        .route(
            "/cache/entries/:key",
            get(get_handler::<P>).delete(remove_handler::<P>),
        )
        .route("/cache/entries/:key/exists", get(exists_handler::<P>))
        .route(
            "/cache/remove-by-pattern",
            post(remove_by_pattern_handler::<P>),
        )
        .route("/cache/clear", post(clear_handler::<P>))
        .route("/health", get(health_handler::<P>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
