use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{
    cache::{cache_clear, cache_stats},
    chat::chat,
    liveness::live,
    readiness::ready,
};

pub mod api_state;
pub mod error;
mod routes;

use api_state::ApiState;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new()
        .route("/chat", post(chat))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(cache_clear))
        .route("/ready", get(ready))
        .route("/live", get(live))
}
