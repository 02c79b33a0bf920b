use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use chat_pipeline::{run_chat_pipeline, ChatDiagnostics};
use common::message::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_rag_enabled")]
    pub rag_enabled: bool,
}

fn default_rag_enabled() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<ChatDiagnostics>,
}

/// Answers one conversation turn. Malformed bodies are a 400 before any
/// provider is contacted; only a draft-generation failure becomes a 500.
pub async fn chat(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload
        .map_err(|rejection| ApiError::ValidationError(rejection.body_text()))?;

    if input.messages.is_empty() {
        return Err(ApiError::ValidationError(
            "messages must not be empty".to_string(),
        ));
    }

    let outcome = run_chat_pipeline(
        state.pipeline_deps(),
        &input.messages,
        input.rag_enabled,
        state.pipeline_config.clone(),
    )
    .await?;

    info!(
        cached = outcome.cached,
        content_chars = outcome.content.chars().count(),
        "chat request answered"
    );

    Ok(Json(ChatResponse {
        content: outcome.content,
        cached: outcome.cached,
        diagnostics: outcome.diagnostics,
    }))
}
