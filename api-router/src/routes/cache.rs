use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::info;

use crate::api_state::ApiState;

pub async fn cache_stats(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.cache.stats().await)
}

pub async fn cache_clear(State(state): State<ApiState>) -> impl IntoResponse {
    state.cache.clear().await;
    info!("response and embedding caches cleared via api");
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
