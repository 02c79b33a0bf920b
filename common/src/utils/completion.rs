use std::sync::Arc;

use async_openai::{
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs,
    },
    Client,
};

use crate::{
    error::AppError,
    message::{ChatMessage, MessageRole},
    utils::config::AppConfig,
};

/// Parameters for a single completion call. Timeouts are enforced by the
/// caller, not here.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Clone)]
pub struct CompletionProvider {
    inner: CompletionInner,
}

#[derive(Clone)]
enum CompletionInner {
    OpenAI {
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
    },
    /// Deterministic canned answer; used in tests and offline demos.
    Fixed { response: String },
    /// No backend configured; every call fails.
    Unavailable,
}

impl CompletionProvider {
    pub fn from_config(
        config: &AppConfig,
        client: Option<Arc<Client<async_openai::config::OpenAIConfig>>>,
    ) -> Self {
        match (client, config.openai_api_key.as_deref()) {
            (Some(client), Some(_)) => Self::new_openai(client, config.completion_model.clone()),
            _ => Self::unavailable(),
        }
    }

    pub fn new_openai(
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
    ) -> Self {
        Self {
            inner: CompletionInner::OpenAI { client, model },
        }
    }

    pub fn new_fixed(response: impl Into<String>) -> Self {
        Self {
            inner: CompletionInner::Fixed {
                response: response.into(),
            },
        }
    }

    pub fn unavailable() -> Self {
        Self {
            inner: CompletionInner::Unavailable,
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            CompletionInner::OpenAI { .. } => "openai",
            CompletionInner::Fixed { .. } => "fixed",
            CompletionInner::Unavailable => "unavailable",
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self.inner, CompletionInner::Unavailable)
    }

    /// Runs one completion over a system prompt plus conversation history
    /// and returns the assistant text.
    pub async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String, AppError> {
        match &self.inner {
            CompletionInner::Fixed { response } => Ok(response.clone()),
            CompletionInner::Unavailable => Err(AppError::Completion(
                "no completion backend configured".into(),
            )),
            CompletionInner::OpenAI { client, model } => {
                let messages = build_messages(system_prompt, history)?;
                let request = CreateChatCompletionRequestArgs::default()
                    .model(model)
                    .messages(messages)
                    .max_completion_tokens(params.max_tokens)
                    .temperature(params.temperature)
                    .build()?;

                let response = client.chat().create(request).await?;

                response
                    .choices
                    .first()
                    .and_then(|choice| choice.message.content.clone())
                    .ok_or(AppError::LLMParsing(
                        "No content found in LLM response".into(),
                    ))
            }
        }
    }
}

fn build_messages(
    system_prompt: &str,
    history: &[ChatMessage],
) -> Result<Vec<ChatCompletionRequestMessage>, AppError> {
    let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(history.len() + 1);
    messages.push(ChatCompletionRequestSystemMessage::from(system_prompt.to_owned()).into());

    for msg in history {
        match msg.role {
            MessageRole::User => {
                messages.push(ChatCompletionRequestUserMessage::from(msg.content.clone()).into());
            }
            MessageRole::Assistant => {
                messages.push(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(msg.content.clone())
                        .build()?
                        .into(),
                );
            }
            // Client-supplied system turns are folded in as-is, after the
            // service prompt.
            MessageRole::System => {
                messages
                    .push(ChatCompletionRequestSystemMessage::from(msg.content.clone()).into());
            }
        }
    }

    Ok(messages)
}
