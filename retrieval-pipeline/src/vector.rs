//! Similarity-search backends.
//!
//! The external store is reached through a single RPC-style call; an
//! in-memory backend provides cosine search for tests and fully-local
//! deployments.

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::error::AppError;

/// One raw similarity hit as returned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub similarity: f32,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A document held by the in-memory backend.
#[derive(Debug, Clone)]
pub struct MemoryDoc {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    threshold: f32,
    limit: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Clone)]
pub enum VectorStore {
    /// JSON-over-HTTP RPC against an external similarity-search service.
    Http { client: reqwest::Client, url: String },
    /// In-process cosine search.
    Memory { docs: Vec<MemoryDoc> },
}

impl VectorStore {
    pub fn http(url: impl Into<String>) -> Self {
        Self::Http {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn memory(docs: Vec<MemoryDoc>) -> Self {
        Self::Memory { docs }
    }

    pub fn backend_label(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Memory { .. } => "memory",
        }
    }

    /// Returns up to `max_results` hits with `similarity >= threshold`,
    /// best first.
    pub async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        match self {
            Self::Http { client, url } => {
                let request = SearchRequest {
                    vector: embedding,
                    threshold,
                    limit: max_results,
                };

                let response = client
                    .post(url)
                    .json(&request)
                    .send()
                    .await?
                    .error_for_status()?;

                let body: SearchResponse = response.json().await?;
                debug!(hits = body.results.len(), "similarity search returned");
                Ok(body.results)
            }
            Self::Memory { docs } => {
                let mut hits: Vec<SearchHit> = docs
                    .iter()
                    .map(|doc| SearchHit {
                        text: doc.text.clone(),
                        similarity: cosine_similarity(embedding, &doc.embedding),
                        metadata: doc.metadata.clone(),
                    })
                    .filter(|hit| hit.similarity >= threshold)
                    .collect();

                hits.sort_by(|a, b| {
                    b.similarity
                        .partial_cmp(&a.similarity)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                hits.truncate(max_results);
                Ok(hits)
            }
        }
    }
}

/// Cosine similarity clamped into [0, 1]; mismatched or zero-length
/// vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    cosine.clamp(0.0, 1.0)
}
