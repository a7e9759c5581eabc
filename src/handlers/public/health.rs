// handlers/public/health.rs - GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// Liveness of this service plus reachability of the platform backend
pub async fn health_get(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let sessions = state.sessions.len().await;

    match state.backend.health().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "backend": "ok",
                    "sessions": sessions
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "backend unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "backend_error": e.to_string(),
                    "sessions": sessions
                }
            })),
        ),
    }
}
