mod config;
mod diagnostics;
mod stages;
mod state;

pub use config::ChatPipelineConfig;
pub use diagnostics::ChatDiagnostics;

use tracing::{info, instrument};
use uuid::Uuid;

use answer_cache::CacheService;
use common::{
    error::AppError,
    message::{latest_user_content, ChatMessage},
    utils::{completion::CompletionProvider, embedding::EmbeddingProvider},
};
use retrieval_pipeline::vector::VectorStore;

/// Borrowed handles to everything the pipeline talks to.
pub struct ChatPipelineDeps<'a> {
    pub completion: &'a CompletionProvider,
    pub embedder: &'a EmbeddingProvider,
    pub vector_store: Option<&'a VectorStore>,
    pub cache: &'a CacheService,
}

#[derive(Debug)]
pub struct ChatOutcome {
    pub content: String,
    pub cached: bool,
    pub diagnostics: Option<ChatDiagnostics>,
}

/// Answers one conversation turn: cache lookup, then concurrent draft
/// generation and context retrieval, then an optional enhancement pass.
///
/// Only validation and draft failures surface as errors; the retrieval
/// and enhancement branches degrade silently to keep the answer path
/// available.
#[instrument(skip_all, fields(rag_enabled = rag_enabled))]
pub async fn run_chat_pipeline<'a>(
    deps: ChatPipelineDeps<'a>,
    messages: &'a [ChatMessage],
    rag_enabled: bool,
    config: ChatPipelineConfig,
) -> Result<ChatOutcome, AppError> {
    let question = latest_user_content(messages)
        .ok_or_else(|| AppError::Validation("conversation has no user message".to_string()))?
        .to_owned();
    if question.trim().is_empty() {
        return Err(AppError::Validation(
            "latest user message is empty".to_string(),
        ));
    }

    let request_id = Uuid::new_v4().to_string();
    // retrieval is only live when a vector store is attached; the cache
    // namespace follows what actually grounded the answer
    let rag_active = rag_enabled && deps.vector_store.is_some();
    info!(
        %request_id,
        rag_enabled = rag_active,
        question_chars = question.chars().count(),
        "chat pipeline started"
    );

    let mut ctx =
        stages::PipelineContext::new(deps, messages, question, rag_active, config, request_id);

    let machine = state::ready();
    let (machine, cached) = stages::check_cache(machine, &mut ctx).await?;
    if let Some(hit) = cached {
        stages::serve_cached(machine)?;
        info!(fuzzy = hit.fuzzy, "answer served from response cache");
        ctx.diagnostics.cache_fuzzy_hit = hit.fuzzy;
        ctx.diagnostics.total_ms = ctx.started.elapsed().as_millis();
        return Ok(ChatOutcome {
            content: hit.answer,
            cached: true,
            diagnostics: Some(ctx.diagnostics),
        });
    }

    let machine = stages::dispatch_and_merge(machine, &mut ctx).await?;

    let content = if ctx.should_enhance() {
        let machine = stages::enhance(machine, &mut ctx).await?;
        stages::finalize_from_enhanced(machine, &mut ctx).await?
    } else {
        stages::finalize_from_draft(machine, &mut ctx).await?
    };

    info!(
        total_ms = ctx.diagnostics.total_ms as u64,
        enhanced = ctx.diagnostics.enhanced,
        context_chunks = ctx.diagnostics.context_chunks,
        "chat pipeline completed"
    );

    Ok(ChatOutcome {
        content,
        cached: false,
        diagnostics: Some(ctx.diagnostics),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::utils::config::AppConfig;
    use retrieval_pipeline::vector::MemoryDoc;

    const FIXED_ANSWER: &str = "管理費は共用部分の維持管理に充てる費用です。";

    fn test_deps_config() -> ChatPipelineConfig {
        let mut config = ChatPipelineConfig::default();
        // hashed embeddings produce small cosines; rank on lexical signal
        config.retrieval.threshold = 0.0;
        config.retrieval.tuning.min_similarity = 0.0;
        config
    }

    async fn memory_store(embedder: &EmbeddingProvider, texts: &[&str]) -> VectorStore {
        let mut docs = Vec::new();
        for text in texts {
            docs.push(MemoryDoc {
                text: (*text).to_owned(),
                embedding: embedder.embed(text).await.expect("embedding"),
                metadata: None,
            });
        }
        VectorStore::memory(docs)
    }

    #[tokio::test]
    async fn test_second_identical_question_is_served_from_cache() {
        let completion = CompletionProvider::new_fixed(FIXED_ANSWER);
        let embedder = EmbeddingProvider::new_hashed(64).expect("embedder");
        let cache = CacheService::from_config(&AppConfig::default());
        let messages = vec![ChatMessage::user("管理費とは")];

        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: None,
            cache: &cache,
        };
        let first = run_chat_pipeline(deps, &messages, false, test_deps_config())
            .await
            .expect("first answer");
        assert!(!first.cached);
        assert_eq!(first.content, FIXED_ANSWER);
        assert!(first.diagnostics.is_some());

        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: None,
            cache: &cache,
        };
        let second = run_chat_pipeline(deps, &messages, false, test_deps_config())
            .await
            .expect("second answer");
        assert!(second.cached);
        assert_eq!(second.content, FIXED_ANSWER);
        let diagnostics = second.diagnostics.expect("cache-hit diagnostics");
        assert!(!diagnostics.cache_fuzzy_hit);
    }

    #[tokio::test]
    async fn test_paraphrased_question_is_served_as_fuzzy_cache_hit() {
        let completion = CompletionProvider::new_fixed(FIXED_ANSWER);
        let embedder = EmbeddingProvider::new_hashed(64).expect("embedder");
        let cache = CacheService::from_config(&AppConfig::default());

        let first_turn = vec![ChatMessage::user("修繕積立金とは")];
        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: None,
            cache: &cache,
        };
        run_chat_pipeline(deps, &first_turn, false, test_deps_config())
            .await
            .expect("first answer");

        let paraphrase = vec![ChatMessage::user("修繕積立金について教えて")];
        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: None,
            cache: &cache,
        };
        let outcome = run_chat_pipeline(deps, &paraphrase, false, test_deps_config())
            .await
            .expect("paraphrased answer");

        assert!(outcome.cached);
        assert_eq!(outcome.content, FIXED_ANSWER);
        let diagnostics = outcome.diagnostics.expect("cache-hit diagnostics");
        assert!(diagnostics.cache_fuzzy_hit);
    }

    #[tokio::test]
    async fn test_grounded_flow_enhances_against_context() {
        let completion = CompletionProvider::new_fixed(FIXED_ANSWER);
        let embedder = EmbeddingProvider::new_hashed(64).expect("embedder");
        let cache = CacheService::from_config(&AppConfig::default());
        let store = memory_store(
            &embedder,
            &["管理費とは、共用部分の管理に要する費用をいう。"],
        )
        .await;
        let messages = vec![ChatMessage::user("管理費とは")];

        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: Some(&store),
            cache: &cache,
        };
        let outcome = run_chat_pipeline(deps, &messages, true, test_deps_config())
            .await
            .expect("grounded answer");

        assert!(!outcome.cached);
        assert_eq!(outcome.content, FIXED_ANSWER);
        let diagnostics = outcome.diagnostics.expect("diagnostics");
        assert!(diagnostics.rag_enabled);
        assert!(diagnostics.enhanced);
        assert!(diagnostics.context_chunks >= 1);
        assert!(diagnostics.retrieval.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_vector_store_still_answers() {
        let completion = CompletionProvider::new_fixed(FIXED_ANSWER);
        let embedder = EmbeddingProvider::new_hashed(64).expect("embedder");
        let cache = CacheService::from_config(&AppConfig::default());
        // nothing listens on the discard port
        let store = VectorStore::http("http://127.0.0.1:9/search");
        let messages = vec![ChatMessage::user("理事会の役割を教えてください")];

        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: Some(&store),
            cache: &cache,
        };
        let outcome = run_chat_pipeline(deps, &messages, true, test_deps_config())
            .await
            .expect("degraded answer");

        assert!(!outcome.cached);
        assert_eq!(outcome.content, FIXED_ANSWER);
        let diagnostics = outcome.diagnostics.expect("diagnostics");
        assert_eq!(diagnostics.context_chunks, 0);
        assert!(!diagnostics.enhanced);
    }

    #[tokio::test]
    async fn test_rag_disabled_skips_retrieval_entirely() {
        let completion = CompletionProvider::new_fixed(FIXED_ANSWER);
        let embedder = EmbeddingProvider::new_hashed(64).expect("embedder");
        let cache = CacheService::from_config(&AppConfig::default());
        let store = memory_store(&embedder, &["第27条 管理費に関する定め。"]).await;
        let messages = vec![ChatMessage::user("管理費の用途は？")];

        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: Some(&store),
            cache: &cache,
        };
        let outcome = run_chat_pipeline(deps, &messages, false, test_deps_config())
            .await
            .expect("plain answer");

        let diagnostics = outcome.diagnostics.expect("diagnostics");
        assert!(!diagnostics.rag_enabled);
        assert!(diagnostics.retrieval.is_none());
        assert!(!diagnostics.enhanced);
    }

    #[tokio::test]
    async fn test_draft_failure_fails_the_request() {
        let completion = CompletionProvider::unavailable();
        let embedder = EmbeddingProvider::new_hashed(64).expect("embedder");
        let cache = CacheService::from_config(&AppConfig::default());
        let messages = vec![ChatMessage::user("管理費とは")];

        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: None,
            cache: &cache,
        };
        let result = run_chat_pipeline(deps, &messages, false, test_deps_config()).await;
        assert!(matches!(result, Err(AppError::Completion(_))));

        // the failure must not poison the cache
        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: None,
            cache: &cache,
        };
        let retry = run_chat_pipeline(deps, &messages, false, test_deps_config()).await;
        assert!(retry.is_err());
    }

    #[tokio::test]
    async fn test_conversation_without_user_turn_is_rejected() {
        let completion = CompletionProvider::new_fixed(FIXED_ANSWER);
        let embedder = EmbeddingProvider::new_hashed(64).expect("embedder");
        let cache = CacheService::from_config(&AppConfig::default());
        let messages = vec![ChatMessage::assistant("こんにちは")];

        let deps = ChatPipelineDeps {
            completion: &completion,
            embedder: &embedder,
            vector_store: None,
            cache: &cache,
        };
        let result = run_chat_pipeline(deps, &messages, false, test_deps_config()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
