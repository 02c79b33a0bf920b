use serde::Serialize;

use retrieval_pipeline::RetrievalTimings;

/// Per-request instrumentation returned alongside the answer. Cache
/// hits carry only the id, grounding and fuzzy-hit fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatDiagnostics {
    pub request_id: String,
    pub rag_enabled: bool,
    pub cache_fuzzy_hit: bool,
    pub draft_ms: u128,
    pub retrieval: Option<RetrievalTimings>,
    pub context_chunks: usize,
    pub context_previews: Vec<String>,
    pub enhanced: bool,
    pub total_ms: u128,
}
