use std::sync::Arc;

use answer_cache::CacheService;
use chat_pipeline::{ChatPipelineConfig, ChatPipelineDeps};
use common::utils::{
    completion::CompletionProvider,
    config::AppConfig,
    embedding::EmbeddingProvider,
};
use retrieval_pipeline::vector::VectorStore;

#[derive(Clone)]
pub struct ApiState {
    pub config: AppConfig,
    pub pipeline_config: ChatPipelineConfig,
    pub completion: Arc<CompletionProvider>,
    pub embedder: Arc<EmbeddingProvider>,
    pub vector_store: Option<Arc<VectorStore>>,
    pub cache: Arc<CacheService>,
}

impl ApiState {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = config.openai_api_key.as_deref().map(|key| {
            Arc::new(async_openai::Client::with_config(
                async_openai::config::OpenAIConfig::new()
                    .with_api_key(key)
                    .with_api_base(&config.openai_base_url),
            ))
        });

        let completion = Arc::new(CompletionProvider::from_config(config, client.clone()));
        let embedder = Arc::new(EmbeddingProvider::from_config(config, client)?);
        let vector_store = config
            .vector_store_url
            .as_deref()
            .map(|url| Arc::new(VectorStore::http(url)));

        Ok(Self {
            pipeline_config: ChatPipelineConfig::from_config(config),
            cache: Arc::new(CacheService::from_config(config)),
            config: config.clone(),
            completion,
            embedder,
            vector_store,
        })
    }

    pub fn pipeline_deps(&self) -> ChatPipelineDeps<'_> {
        ChatPipelineDeps {
            completion: &self.completion,
            embedder: &self.embedder,
            vector_store: self.vector_store.as_deref(),
            cache: &self.cache,
        }
    }
}
