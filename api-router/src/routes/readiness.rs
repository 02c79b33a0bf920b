use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness probe: returns 200 when a completion backend is configured,
/// else 503. Retrieval being down does not fail readiness; the answer
/// path degrades instead.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    if state.completion.is_configured() {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": { "completion": state.completion.backend_label() }
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "checks": { "completion": "unconfigured" }
            })),
        )
    }
}
