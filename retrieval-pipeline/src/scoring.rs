use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use answer_cache::keys::keywords;

use crate::{
    classify::classify_chunk,
    preview::build_preview,
    {RankedChunk, RetrievedChunk},
};

/// Tunable parameters governing the ranking pass. The magnitudes are
/// empirically chosen; treat them as configuration, not invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerTuning {
    pub similarity_weight: f32,
    pub lexical_weight: f32,
    /// Per-matched-keyword weight, multiplied by keyword length; longer
    /// terms carry more evidence.
    pub keyword_length_weight: f32,
    pub multi_keyword_bonus: f32,
    pub definition_bonus: f32,
    pub article_bonus: f32,
    pub housing_list_penalty: f32,
    /// Scale applied to the lexical score of non-definition chunks when
    /// the question is a 「◯◯とは」 form.
    pub non_definition_scale: f32,
    pub min_chunk_chars: usize,
    pub min_similarity: f32,
    /// Hits above this similarity skip the minimum-similarity filter.
    pub strong_similarity: f32,
    pub candidate_cap: usize,
    pub max_keywords: usize,
    pub top_k: usize,
    pub preview_max_segments: usize,
    pub preview_fallback_chars: usize,
}

impl Default for RankerTuning {
    fn default() -> Self {
        Self {
            similarity_weight: 0.3,
            lexical_weight: 0.7,
            keyword_length_weight: 0.5,
            multi_keyword_bonus: 1.0,
            definition_bonus: 3.0,
            article_bonus: 1.5,
            housing_list_penalty: 0.5,
            non_definition_scale: 0.5,
            min_chunk_chars: 10,
            min_similarity: 0.1,
            strong_similarity: 0.5,
            candidate_cap: 10,
            max_keywords: 5,
            top_k: 3,
            preview_max_segments: 3,
            preview_fallback_chars: 100,
        }
    }
}

/// Extracts ranking keywords from the user question: stop phrases
/// stripped, tokens longer than one character, capped.
pub fn question_keywords(question: &str, max_keywords: usize) -> Vec<String> {
    let mut kws = keywords(question);
    kws.truncate(max_keywords);
    kws
}

/// Whether the question asks for a definition (「◯◯とは」 form).
pub fn is_definition_question(question: &str) -> bool {
    question.contains("とは") || question.to_lowercase().contains("what is")
}

/// Re-scores raw similarity hits with lexical and structural signals and
/// returns the top-k chunks, best first. Similarity is the secondary
/// signal; embedding similarity alone is unreliable for short regulatory
/// text.
pub fn rank_chunks(
    chunks: Vec<RetrievedChunk>,
    question: &str,
    tuning: &RankerTuning,
) -> Vec<RankedChunk> {
    let kws = question_keywords(question, tuning.max_keywords);
    let definition_question = is_definition_question(question);

    let candidates: Vec<RetrievedChunk> = chunks
        .into_iter()
        .filter(|chunk| chunk.text.chars().count() >= tuning.min_chunk_chars)
        .filter(|chunk| {
            chunk.similarity >= tuning.min_similarity
                || chunk.similarity > tuning.strong_similarity
        })
        .take(tuning.candidate_cap)
        .collect();

    let mut ranked: Vec<RankedChunk> = candidates
        .into_iter()
        .map(|chunk| {
            let classification = classify_chunk(&chunk.text);

            // keywords come out of normalization lowercased
            let haystack = chunk.text.to_lowercase();
            let matched: Vec<&String> = kws
                .iter()
                .filter(|kw| haystack.contains(kw.as_str()))
                .collect();
            let mut lexical: f32 = matched
                .iter()
                .map(|kw| kw.chars().count() as f32 * tuning.keyword_length_weight)
                .sum();
            if matched.len() > 1 {
                lexical += tuning.multi_keyword_bonus;
            }

            if definition_question && !classification.is_definition {
                lexical *= tuning.non_definition_scale;
            }

            if classification.is_definition {
                lexical += tuning.definition_bonus;
            } else if classification.has_article {
                lexical += tuning.article_bonus;
            }
            if classification.is_housing_list && !classification.has_article {
                lexical -= tuning.housing_list_penalty;
            }

            let combined = chunk.similarity * tuning.similarity_weight
                + lexical.max(0.0) * tuning.lexical_weight;

            let preview = build_preview(
                &chunk.text,
                &kws,
                tuning.preview_max_segments,
                tuning.preview_fallback_chars,
            );

            RankedChunk {
                chunk,
                lexical_score: lexical,
                classification,
                combined_score: combined,
                preview,
            }
        })
        .filter(|ranked| ranked.combined_score > 0.0)
        .collect();

    ranked.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(tuning.top_k);
    ranked
}
