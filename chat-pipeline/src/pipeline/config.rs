use std::time::Duration;

use common::utils::{completion::CompletionParams, config::AppConfig};
use retrieval_pipeline::{scoring::RankerTuning, RetrievalConfig};

/// Timeouts, completion parameters and retrieval tuning for one request.
#[derive(Debug, Clone)]
pub struct ChatPipelineConfig {
    pub draft_timeout: Duration,
    pub enhance_timeout: Duration,
    pub retrieval_timeout: Duration,
    pub draft_params: CompletionParams,
    pub enhance_params: CompletionParams,
    pub retrieval: RetrievalConfig,
}

impl Default for ChatPipelineConfig {
    fn default() -> Self {
        Self {
            draft_timeout: Duration::from_secs(12),
            enhance_timeout: Duration::from_secs(8),
            retrieval_timeout: Duration::from_secs(10),
            draft_params: CompletionParams {
                max_tokens: 1024,
                temperature: 0.7,
            },
            enhance_params: CompletionParams {
                max_tokens: 1024,
                temperature: 0.3,
            },
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl ChatPipelineConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        let tuning = RankerTuning {
            similarity_weight: config.similarity_weight,
            lexical_weight: config.lexical_weight,
            top_k: config.context_top_k,
            ..RankerTuning::default()
        };

        Self {
            draft_timeout: Duration::from_secs(config.draft_timeout_secs),
            enhance_timeout: Duration::from_secs(config.enhance_timeout_secs),
            retrieval_timeout: Duration::from_secs(config.retrieval_timeout_secs),
            retrieval: RetrievalConfig {
                threshold: config.search_threshold,
                max_results: config.search_max_results,
                tuning,
            },
            ..Self::default()
        }
    }
}
