use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use common::utils::config::AppConfig;

use crate::{
    keys::{find_similar, normalize},
    store::{CacheStats, TtlLruCache},
};

const RAG_KEY_PREFIX: &str = "rag::";
const DRAFT_KEY_PREFIX: &str = "draft::";

/// Sizing and expiry policy for both cache instances.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub response_capacity: usize,
    pub response_ttl_rag: Duration,
    pub response_ttl_no_rag: Duration,
    pub embedding_capacity: usize,
    pub embedding_ttl: Duration,
    pub fuzzy_threshold: f32,
}

impl CachePolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            response_capacity: config.response_cache_capacity,
            response_ttl_rag: Duration::seconds(config.response_cache_ttl_rag_secs as i64),
            response_ttl_no_rag: Duration::seconds(config.response_cache_ttl_no_rag_secs as i64),
            embedding_capacity: config.embedding_cache_capacity,
            embedding_ttl: Duration::seconds(config.embedding_cache_ttl_secs as i64),
            fuzzy_threshold: config.fuzzy_match_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheServiceStats {
    pub response_cache: CacheStats,
    pub embedding_cache: CacheStats,
}

/// A response-cache hit; `fuzzy` marks a keyword-overlap match rather
/// than an exact key hit.
#[derive(Debug, Clone)]
pub struct ResponseHit {
    pub answer: String,
    pub fuzzy: bool,
}

/// Process-lifetime cache layer: a small short-lived response cache and
/// a larger long-lived embedding cache. Both are best-effort; nothing
/// here returns an error to the caller.
pub struct CacheService {
    policy: CachePolicy,
    responses: Mutex<TtlLruCache<String>>,
    embeddings: Mutex<TtlLruCache<Vec<f32>>>,
}

impl CacheService {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            responses: Mutex::new(TtlLruCache::new(policy.response_capacity)),
            embeddings: Mutex::new(TtlLruCache::new(policy.embedding_capacity)),
            policy,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(CachePolicy::from_config(config))
    }

    /// Looks up a cached answer by exact normalized key, then by fuzzy
    /// keyword overlap against the live keys in the same namespace.
    pub async fn get_response(&self, question: &str, rag_enabled: bool) -> Option<ResponseHit> {
        let key = response_key(question, rag_enabled);
        let mut store = self.responses.lock().await;

        if let Some(answer) = store.get(&key) {
            debug!(%key, "response cache exact hit");
            return Some(ResponseHit {
                answer,
                fuzzy: false,
            });
        }

        let prefix = key_prefix(rag_enabled);
        let candidates: Vec<String> = store
            .keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(prefix).map(str::to_owned))
            .collect();

        let question_part = key.strip_prefix(prefix).unwrap_or(&key);
        let matched = find_similar(
            question_part,
            candidates.iter().map(String::as_str),
            self.policy.fuzzy_threshold,
        )?;

        let matched_key = format!("{prefix}{matched}");
        // counts the exact-miss-then-fuzzy-hit sequence as one lookup
        let answer = store.get_fallback(&matched_key);
        if answer.is_some() {
            debug!(%key, %matched_key, "response cache fuzzy hit");
        }
        answer.map(|answer| ResponseHit {
            answer,
            fuzzy: true,
        })
    }

    /// Stores an answer under the normalized question, with a longer TTL
    /// for context-grounded (RAG) answers.
    pub async fn put_response(&self, question: &str, rag_enabled: bool, answer: String) {
        let ttl = if rag_enabled {
            self.policy.response_ttl_rag
        } else {
            self.policy.response_ttl_no_rag
        };
        let key = response_key(question, rag_enabled);
        self.responses.lock().await.set(key, answer, ttl);
    }

    pub async fn get_embedding(&self, text: &str) -> Option<Vec<f32>> {
        self.embeddings.lock().await.get(&normalize(text))
    }

    pub async fn put_embedding(&self, text: &str, vector: Vec<f32>) {
        self.embeddings
            .lock()
            .await
            .set(normalize(text), vector, self.policy.embedding_ttl);
    }

    /// Sweeps expired entries from both instances; returns
    /// `(responses_removed, embeddings_removed)`.
    pub async fn cleanup(&self) -> (usize, usize) {
        let responses_removed = self.responses.lock().await.cleanup();
        let embeddings_removed = self.embeddings.lock().await.cleanup();
        (responses_removed, embeddings_removed)
    }

    pub async fn clear(&self) {
        self.responses.lock().await.clear();
        self.embeddings.lock().await.clear();
    }

    pub async fn stats(&self) -> CacheServiceStats {
        CacheServiceStats {
            response_cache: self.responses.lock().await.stats(),
            embedding_cache: self.embeddings.lock().await.stats(),
        }
    }

    /// Spawns the periodic cleanup sweep. The task runs for the process
    /// lifetime, independent of request traffic.
    pub fn spawn_cleanup(self: &Arc<Self>, every: StdDuration) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick fires immediately; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let (responses, embeddings) = service.cleanup().await;
                if responses > 0 || embeddings > 0 {
                    info!(
                        responses_removed = responses,
                        embeddings_removed = embeddings,
                        "cache cleanup sweep removed expired entries"
                    );
                }
            }
        })
    }
}

fn key_prefix(rag_enabled: bool) -> &'static str {
    if rag_enabled {
        RAG_KEY_PREFIX
    } else {
        DRAFT_KEY_PREFIX
    }
}

fn response_key(question: &str, rag_enabled: bool) -> String {
    format!("{}{}", key_prefix(rag_enabled), normalize(question))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_policy() -> CachePolicy {
        CachePolicy {
            response_capacity: 10,
            response_ttl_rag: Duration::minutes(30),
            response_ttl_no_rag: Duration::minutes(10),
            embedding_capacity: 50,
            embedding_ttl: Duration::hours(24),
            fuzzy_threshold: 0.6,
        }
    }

    #[tokio::test]
    async fn test_exact_response_roundtrip() {
        let service = CacheService::new(test_policy());
        service
            .put_response("管理費について教えて", true, "answer".into())
            .await;

        // punctuation variant hits the same normalized key
        let hit = service
            .get_response("管理費について教えて？", true)
            .await
            .expect("exact hit");
        assert_eq!(hit.answer, "answer");
        assert!(!hit.fuzzy);
    }

    #[tokio::test]
    async fn test_rag_namespaces_are_independent() {
        let service = CacheService::new(test_policy());
        service
            .put_response("管理費とは", true, "rag answer".into())
            .await;

        assert!(service.get_response("管理費とは", false).await.is_none());
        let hit = service
            .get_response("管理費とは", true)
            .await
            .expect("rag hit");
        assert_eq!(hit.answer, "rag answer");
    }

    #[tokio::test]
    async fn test_fuzzy_lookup_absorbs_paraphrase() {
        let service = CacheService::new(test_policy());
        service
            .put_response("修繕積立金とは", true, "積立金の説明".into())
            .await;

        let hit = service
            .get_response("修繕積立金について教えて", true)
            .await
            .expect("fuzzy hit");
        assert_eq!(hit.answer, "積立金の説明");
        assert!(hit.fuzzy);

        // the two-step lookup counts once
        let stats = service.stats().await;
        assert_eq!(stats.response_cache.total_hits, 1);
        assert_eq!(stats.response_cache.total_misses, 0);
    }

    #[tokio::test]
    async fn test_fuzzy_lookup_rejects_unrelated() {
        let service = CacheService::new(test_policy());
        service
            .put_response("理事会の役割", true, "理事会の説明".into())
            .await;

        assert!(service.get_response("ゴミ出しのルール", true).await.is_none());
    }

    #[tokio::test]
    async fn test_embedding_roundtrip_uses_normalized_key() {
        let service = CacheService::new(test_policy());
        service.put_embedding("管理費とは？", vec![0.1, 0.2]).await;
        assert_eq!(
            service.get_embedding("管理費とは").await,
            Some(vec![0.1, 0.2])
        );
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let service = CacheService::new(test_policy());
        service.put_response("q", true, "a".into()).await;
        service.put_embedding("q", vec![1.0]).await;

        let stats = service.stats().await;
        assert_eq!(stats.response_cache.total_entries, 1);
        assert_eq!(stats.embedding_cache.total_entries, 1);

        service.clear().await;
        let stats = service.stats().await;
        assert_eq!(stats.response_cache.total_entries, 0);
        assert_eq!(stats.embedding_cache.total_entries, 0);
    }
}
