pub mod classify;
pub mod preview;
pub mod scoring;
pub mod vector;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use answer_cache::CacheService;
use common::utils::embedding::EmbeddingProvider;

use crate::{
    classify::ChunkClassification,
    scoring::{rank_chunks, RankerTuning},
    vector::VectorStore,
};

/// One raw chunk as handed to the ranker. Request-scoped; never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub similarity: f32,
    pub metadata: Option<serde_json::Value>,
}

impl From<vector::SearchHit> for RetrievedChunk {
    fn from(hit: vector::SearchHit) -> Self {
        Self {
            text: hit.text,
            similarity: hit.similarity,
            metadata: hit.metadata,
        }
    }
}

/// A chunk after the ranking pass.
#[derive(Debug, Clone, Serialize)]
pub struct RankedChunk {
    pub chunk: RetrievedChunk,
    pub lexical_score: f32,
    pub classification: ChunkClassification,
    pub combined_score: f32,
    pub preview: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalTimings {
    pub embedding_ms: u128,
    pub search_ms: u128,
    pub ranking_ms: u128,
    pub embedding_cache_hit: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalOutput {
    pub chunks: Vec<RankedChunk>,
    pub timings: RetrievalTimings,
}

impl RetrievalOutput {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Concatenated ranked context for the enhancement prompt.
    pub fn context_text(&self) -> String {
        self.chunks
            .iter()
            .map(|ranked| ranked.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n")
    }
}

/// Per-request retrieval parameters.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub threshold: f32,
    pub max_results: usize,
    pub tuning: RankerTuning,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            max_results: 10,
            tuning: RankerTuning::default(),
        }
    }
}

/// Runs the full retrieval branch: embedding (cache first), similarity
/// search, then lexical/structural ranking. Degrades to an empty result
/// on any provider failure; retrieval must never abort the user-facing
/// answer.
#[instrument(skip_all, fields(search_query_chars = search_query.chars().count()))]
pub async fn retrieve_context(
    store: &VectorStore,
    embedder: &EmbeddingProvider,
    cache: &CacheService,
    question: &str,
    search_query: &str,
    config: &RetrievalConfig,
) -> RetrievalOutput {
    let mut timings = RetrievalTimings::default();

    let embed_started = Instant::now();
    let embedding = match cache.get_embedding(search_query).await {
        Some(cached) => {
            timings.embedding_cache_hit = true;
            cached
        }
        None => match embedder.embed(search_query).await {
            Ok(vector) => {
                cache.put_embedding(search_query, vector.clone()).await;
                vector
            }
            Err(error) => {
                warn!(%error, "embedding failed; retrieval degrades to empty context");
                return RetrievalOutput::default();
            }
        },
    };
    timings.embedding_ms = embed_started.elapsed().as_millis();

    let search_started = Instant::now();
    let hits = match store
        .search(&embedding, config.threshold, config.max_results)
        .await
    {
        Ok(hits) => hits,
        Err(error) => {
            warn!(%error, "similarity search failed; retrieval degrades to empty context");
            return RetrievalOutput {
                chunks: Vec::new(),
                timings,
            };
        }
    };
    timings.search_ms = search_started.elapsed().as_millis();

    debug!(
        hits = hits.len(),
        cache_hit = timings.embedding_cache_hit,
        backend = store.backend_label(),
        "retrieval raw hits collected"
    );

    let ranking_started = Instant::now();
    let chunks = rank_chunks(
        hits.into_iter().map(RetrievedChunk::from).collect(),
        question,
        &config.tuning,
    );
    timings.ranking_ms = ranking_started.elapsed().as_millis();

    RetrievalOutput { chunks, timings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_cache::service::CachePolicy;
    use chrono::Duration;
    use vector::MemoryDoc;

    fn test_cache() -> CacheService {
        CacheService::new(CachePolicy {
            response_capacity: 10,
            response_ttl_rag: Duration::minutes(30),
            response_ttl_no_rag: Duration::minutes(10),
            embedding_capacity: 50,
            embedding_ttl: Duration::hours(24),
            fuzzy_threshold: 0.6,
        })
    }

    fn hashed_provider() -> EmbeddingProvider {
        EmbeddingProvider::new_hashed(128).expect("hashed provider")
    }

    async fn doc(embedder: &EmbeddingProvider, text: &str) -> MemoryDoc {
        MemoryDoc {
            text: text.to_owned(),
            embedding: embedder.embed(text).await.expect("hashed embed"),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_retrieve_context_end_to_end() {
        let embedder = hashed_provider();
        let cache = test_cache();
        let store = VectorStore::memory(vec![
            doc(
                &embedder,
                "管理費とは、共用部分の維持管理に要する費用をいう。",
            )
            .await,
            doc(&embedder, "ペットの飼育は理事会の承認を必要とする。").await,
        ]);

        let config = RetrievalConfig {
            threshold: 0.0,
            ..RetrievalConfig::default()
        };
        let output = retrieve_context(
            &store,
            &embedder,
            &cache,
            "管理費とは",
            "管理費とは",
            &config,
        )
        .await;

        assert!(!output.is_empty());
        let top = output.chunks.first().expect("ranked chunk");
        assert!(top.chunk.text.contains("管理費"));
        assert!(!output.context_text().is_empty());
        assert!(!output.timings.embedding_cache_hit);
    }

    #[tokio::test]
    async fn test_second_retrieval_hits_embedding_cache() {
        let embedder = hashed_provider();
        let cache = test_cache();
        let store = VectorStore::memory(vec![]);
        let config = RetrievalConfig::default();

        let first =
            retrieve_context(&store, &embedder, &cache, "管理費とは", "管理費とは", &config)
                .await;
        assert!(!first.timings.embedding_cache_hit);

        let second =
            retrieve_context(&store, &embedder, &cache, "管理費とは", "管理費とは", &config)
                .await;
        assert!(second.timings.embedding_cache_hit);
    }

    #[tokio::test]
    async fn test_unconfigured_embedder_degrades_to_empty() {
        let embedder = EmbeddingProvider::unavailable();
        let cache = test_cache();
        let store = VectorStore::memory(vec![]);

        let output = retrieve_context(
            &store,
            &embedder,
            &cache,
            "管理費とは",
            "管理費とは",
            &RetrievalConfig::default(),
        )
        .await;

        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_degrades_to_empty() {
        let embedder = hashed_provider();
        let cache = test_cache();
        // nothing listens here; the request errors immediately
        let store = VectorStore::http("http://127.0.0.1:9/search");

        let output = retrieve_context(
            &store,
            &embedder,
            &cache,
            "管理費とは",
            "管理費とは",
            &RetrievalConfig::default(),
        )
        .await;

        assert!(output.is_empty());
    }
}
