use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    OpenAI,
    Hashed,
}

fn default_embedding_backend() -> EmbeddingBackend {
    EmbeddingBackend::OpenAI
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    /// API key for the completion/embedding provider. When absent the
    /// service still starts, but chat requests fail with a 500.
    pub openai_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_completion_model")]
    pub completion_model: String,
    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,

    /// Similarity-search RPC endpoint. Retrieval is disabled when unset.
    #[serde(default)]
    pub vector_store_url: Option<String>,
    #[serde(default = "default_search_threshold")]
    pub search_threshold: f32,
    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // Response cache: answers go stale as regulations and documents
    // change, so it is small and short-lived.
    #[serde(default = "default_response_cache_capacity")]
    pub response_cache_capacity: usize,
    #[serde(default = "default_response_cache_ttl_rag_secs")]
    pub response_cache_ttl_rag_secs: u64,
    #[serde(default = "default_response_cache_ttl_no_rag_secs")]
    pub response_cache_ttl_no_rag_secs: u64,

    // Embedding cache: a text → vector mapping is stable, so it is
    // larger and much longer-lived.
    #[serde(default = "default_embedding_cache_capacity")]
    pub embedding_cache_capacity: usize,
    #[serde(default = "default_embedding_cache_ttl_secs")]
    pub embedding_cache_ttl_secs: u64,

    #[serde(default = "default_cache_cleanup_interval_secs")]
    pub cache_cleanup_interval_secs: u64,
    #[serde(default = "default_fuzzy_match_threshold")]
    pub fuzzy_match_threshold: f32,

    #[serde(default = "default_draft_timeout_secs")]
    pub draft_timeout_secs: u64,
    #[serde(default = "default_enhance_timeout_secs")]
    pub enhance_timeout_secs: u64,
    #[serde(default = "default_retrieval_timeout_secs")]
    pub retrieval_timeout_secs: u64,

    // Blend weights for the ranker. Lexical/structural evidence
    // dominates because embedding similarity alone is unreliable for
    // short regulatory text.
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f32,
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,
    #[serde(default = "default_context_top_k")]
    pub context_top_k: usize,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_search_threshold() -> f32 {
    0.2
}

fn default_search_max_results() -> usize {
    10
}

fn default_http_port() -> u16 {
    3000
}

fn default_response_cache_capacity() -> usize {
    100
}

fn default_response_cache_ttl_rag_secs() -> u64 {
    1800
}

fn default_response_cache_ttl_no_rag_secs() -> u64 {
    600
}

fn default_embedding_cache_capacity() -> usize {
    500
}

fn default_embedding_cache_ttl_secs() -> u64 {
    86_400
}

fn default_cache_cleanup_interval_secs() -> u64 {
    300
}

fn default_fuzzy_match_threshold() -> f32 {
    0.6
}

fn default_draft_timeout_secs() -> u64 {
    12
}

fn default_enhance_timeout_secs() -> u64 {
    8
}

fn default_retrieval_timeout_secs() -> u64 {
    10
}

fn default_similarity_weight() -> f32 {
    0.3
}

fn default_lexical_weight() -> f32 {
    0.7
}

fn default_context_top_k() -> usize {
    3
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: default_base_url(),
            completion_model: default_completion_model(),
            embedding_backend: EmbeddingBackend::Hashed,
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            vector_store_url: None,
            search_threshold: default_search_threshold(),
            search_max_results: default_search_max_results(),
            http_port: 0,
            response_cache_capacity: default_response_cache_capacity(),
            response_cache_ttl_rag_secs: default_response_cache_ttl_rag_secs(),
            response_cache_ttl_no_rag_secs: default_response_cache_ttl_no_rag_secs(),
            embedding_cache_capacity: default_embedding_cache_capacity(),
            embedding_cache_ttl_secs: default_embedding_cache_ttl_secs(),
            cache_cleanup_interval_secs: default_cache_cleanup_interval_secs(),
            fuzzy_match_threshold: default_fuzzy_match_threshold(),
            draft_timeout_secs: default_draft_timeout_secs(),
            enhance_timeout_secs: default_enhance_timeout_secs(),
            retrieval_timeout_secs: default_retrieval_timeout_secs(),
            similarity_weight: default_similarity_weight(),
            lexical_weight: default_lexical_weight(),
            context_top_k: default_context_top_k(),
        }
    }
}
