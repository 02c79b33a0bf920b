use std::time::Instant;

use state_machines::core::GuardError;
use tracing::{debug, instrument, warn};

use answer_cache::ResponseHit;
use common::{error::AppError, message::ChatMessage};
use retrieval_pipeline::{retrieve_context, RetrievalOutput};

use crate::{enhance::enhance_answer, prompts::draft_system_prompt, query::build_search_query};

use super::{
    config::ChatPipelineConfig,
    diagnostics::ChatDiagnostics,
    state::{AnswerPipelineMachine, CacheChecked, Enhanced, Merged, Ready},
    ChatPipelineDeps,
};

pub struct PipelineContext<'a> {
    pub deps: ChatPipelineDeps<'a>,
    pub messages: &'a [ChatMessage],
    pub question: String,
    pub rag_enabled: bool,
    pub config: ChatPipelineConfig,
    pub draft: Option<String>,
    pub retrieval: RetrievalOutput,
    pub diagnostics: ChatDiagnostics,
    pub started: Instant,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        deps: ChatPipelineDeps<'a>,
        messages: &'a [ChatMessage],
        question: String,
        rag_enabled: bool,
        config: ChatPipelineConfig,
        request_id: String,
    ) -> Self {
        Self {
            deps,
            messages,
            question,
            rag_enabled,
            config,
            draft: None,
            retrieval: RetrievalOutput::default(),
            diagnostics: ChatDiagnostics {
                request_id,
                rag_enabled,
                ..ChatDiagnostics::default()
            },
            started: Instant::now(),
        }
    }

    /// Enhancement only makes sense when there is ranked context to
    /// rewrite the draft against.
    pub fn should_enhance(&self) -> bool {
        self.rag_enabled && !self.retrieval.is_empty()
    }
}

#[instrument(level = "trace", skip_all)]
pub async fn check_cache(
    machine: AnswerPipelineMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<(AnswerPipelineMachine<(), CacheChecked>, Option<ResponseHit>), AppError> {
    let hit = ctx
        .deps
        .cache
        .get_response(&ctx.question, ctx.rag_enabled)
        .await;

    let machine = machine
        .check_cache()
        .map_err(|(_, guard)| map_guard_error("check_cache", guard))?;
    Ok((machine, hit))
}

pub fn serve_cached(machine: AnswerPipelineMachine<(), CacheChecked>) -> Result<(), AppError> {
    machine
        .serve_cached()
        .map_err(|(_, guard)| map_guard_error("serve_cached", guard))?;
    Ok(())
}

/// Runs draft generation and context retrieval concurrently and waits
/// for both to settle. A retrieval failure or timeout degrades to an
/// empty context; a draft failure aborts the request.
#[instrument(level = "trace", skip_all)]
pub async fn dispatch_and_merge(
    machine: AnswerPipelineMachine<(), CacheChecked>,
    ctx: &mut PipelineContext<'_>,
) -> Result<AnswerPipelineMachine<(), Merged>, AppError> {
    let draft_branch = async {
        let started = Instant::now();
        let result = match tokio::time::timeout(
            ctx.config.draft_timeout,
            ctx.deps.completion.complete(
                draft_system_prompt(ctx.rag_enabled),
                ctx.messages,
                &ctx.config.draft_params,
            ),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::Completion(format!(
                "draft generation timed out after {}ms",
                ctx.config.draft_timeout.as_millis()
            ))),
        };
        (result, started.elapsed().as_millis())
    };

    let retrieval_branch = async {
        if !ctx.rag_enabled {
            return None;
        }
        let store = ctx.deps.vector_store?;
        let query = build_search_query(ctx.messages)?;

        match tokio::time::timeout(
            ctx.config.retrieval_timeout,
            retrieve_context(
                store,
                ctx.deps.embedder,
                ctx.deps.cache,
                &ctx.question,
                &query,
                &ctx.config.retrieval,
            ),
        )
        .await
        {
            Ok(output) => Some(output),
            Err(_) => {
                warn!(
                    timeout_ms = ctx.config.retrieval_timeout.as_millis() as u64,
                    "context retrieval timed out; answering from the draft alone"
                );
                Some(RetrievalOutput::default())
            }
        }
    };

    let ((draft_result, draft_ms), retrieval_output) = tokio::join!(draft_branch, retrieval_branch);

    ctx.diagnostics.draft_ms = draft_ms;
    if let Some(output) = retrieval_output {
        ctx.diagnostics.retrieval = Some(output.timings.clone());
        ctx.diagnostics.context_chunks = output.chunks.len();
        ctx.diagnostics.context_previews = output
            .chunks
            .iter()
            .map(|ranked| ranked.preview.clone())
            .collect();
        ctx.retrieval = output;
    }

    match draft_result {
        Ok(draft) => {
            debug!(
                draft_chars = draft.chars().count(),
                context_chunks = ctx.retrieval.chunks.len(),
                "draft and retrieval settled"
            );
            ctx.draft = Some(draft);
            machine
                .merge()
                .map_err(|(_, guard)| map_guard_error("merge", guard))
        }
        Err(error) => {
            machine
                .abort()
                .map_err(|(_, guard)| map_guard_error("abort", guard))?;
            Err(error)
        }
    }
}

#[instrument(level = "trace", skip_all)]
pub async fn enhance(
    machine: AnswerPipelineMachine<(), Merged>,
    ctx: &mut PipelineContext<'_>,
) -> Result<AnswerPipelineMachine<(), Enhanced>, AppError> {
    let draft = ctx.draft.clone().ok_or_else(|| {
        AppError::InternalError("draft answer missing before enhancement".to_string())
    })?;
    let context = ctx.retrieval.context_text();

    let (answer, enhanced) = enhance_answer(
        ctx.deps.completion,
        &draft,
        &context,
        &ctx.config.enhance_params,
        ctx.config.enhance_timeout,
    )
    .await;

    ctx.draft = Some(answer);
    ctx.diagnostics.enhanced = enhanced;

    machine
        .enhance()
        .map_err(|(_, guard)| map_guard_error("enhance", guard))
}

pub async fn finalize_from_draft(
    machine: AnswerPipelineMachine<(), Merged>,
    ctx: &mut PipelineContext<'_>,
) -> Result<String, AppError> {
    machine
        .finalize()
        .map_err(|(_, guard)| map_guard_error("finalize", guard))?;
    store_answer(ctx).await
}

pub async fn finalize_from_enhanced(
    machine: AnswerPipelineMachine<(), Enhanced>,
    ctx: &mut PipelineContext<'_>,
) -> Result<String, AppError> {
    machine
        .finalize()
        .map_err(|(_, guard)| map_guard_error("finalize", guard))?;
    store_answer(ctx).await
}

async fn store_answer(ctx: &mut PipelineContext<'_>) -> Result<String, AppError> {
    let answer = ctx.draft.clone().ok_or_else(|| {
        AppError::InternalError("no answer available at finalization".to_string())
    })?;

    ctx.deps
        .cache
        .put_response(&ctx.question, ctx.rag_enabled, answer.clone())
        .await;
    ctx.diagnostics.total_ms = ctx.started.elapsed().as_millis();
    Ok(answer)
}

fn map_guard_error(stage: &'static str, err: GuardError) -> AppError {
    AppError::InternalError(format!(
        "state machine guard '{stage}' failed: guard={}, event={}, kind={:?}",
        err.guard, err.event, err.kind
    ))
}
