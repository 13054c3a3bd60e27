//! Route definitions for the Depot HTTP API.
//!
//! The upload-session surface is the stable external contract; paths and
//! methods are kept as-is.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.store.max_upload_size_bytes as usize;
    let cors = build_cors_layer(&state);

    Router::new()
        .route("/upload/initiate", post(handlers::upload::initiate))
        .route("/upload/chunk", post(handlers::upload::upload_chunk))
        .route("/upload/pause/{upload_id}", put(handlers::upload::pause))
        .route("/upload/status/{upload_id}", get(handlers::upload::status))
        .route("/upload/complete", post(handlers::upload::complete))
        .route("/upload/folder", post(handlers::upload::create_folder))
        .route(
            "/upload/all",
            get(handlers::upload::list_children).delete(handlers::upload::remove_all),
        )
        .route("/upload/move/{upload_id}", put(handlers::upload::move_entry))
        .route("/upload/{upload_id}", delete(handlers::upload::remove))
        .route("/health", get(handlers::health::live))
        .route("/health/ready", get(handlers::health::ready))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from configuration.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.server.cors.allowed_origins;

    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
