use std::time::Duration;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::utils::config::get_config;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn build_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes_v1())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;
    let state = ApiState::from_config(&config)?;

    info!(
        completion_backend = state.completion.backend_label(),
        embedding_backend = state.embedder.backend_label(),
        embedding_dimension = state.embedder.dimension(),
        vector_store = state
            .vector_store
            .as_ref()
            .map_or("none", |store| store.backend_label()),
        "providers initialized"
    );

    // Periodic expiry sweep for both caches, for the process lifetime.
    let _cleanup = state
        .cache
        .spawn_cleanup(Duration::from_secs(config.cache_cleanup_interval_secs));

    let app = build_app(state);

    let serve_address = format!("0.0.0.0:{}", config.http_port);
    info!("Starting server listening on {serve_address}");
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
