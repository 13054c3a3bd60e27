//! Health and readiness endpoints.

use axum::Json;
use axum::extract::State;

use depot_core::error::AppError;

use crate::state::AppState;

/// GET /health — process liveness.
pub async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health/ready — entry store reachability.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state
        .entries
        .find_by_id(uuid::Uuid::nil())
        .await
        .map_err(|e| AppError::service_unavailable(format!("Entry store unreachable: {e}")))?;

    Ok(Json(serde_json::json!({ "status": "ready" })))
}
