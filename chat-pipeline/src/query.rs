//! Search-query construction for the retrieval branch.
//!
//! Context-dependent questions need a wider query than the latest turn
//! alone, but long queries dilute retrieval, so widening is selective.

use common::message::{last_user_contents, latest_user_content, ChatMessage};

// Summarizing language: pull in several preceding turns.
const SUMMARY_MARKERS: &[&str] = &["要約", "まとめ", "全体", "summarize", "overall"];

// Anaphoric pronouns: the question leans on the previous turn.
const ANAPHORA_MARKERS: &[&str] = &["それ", "これ", "あれ", "その", "この", "前の", "さっき"];

const SUMMARY_TURNS: usize = 3;
const ANAPHORA_TURNS: usize = 2;

/// Builds the text sent to the retrieval branch from the conversation.
pub fn build_search_query(messages: &[ChatMessage]) -> Option<String> {
    let latest = latest_user_content(messages)?;

    if contains_any(latest, SUMMARY_MARKERS) {
        return Some(last_user_contents(messages, SUMMARY_TURNS).join("\n"));
    }

    if contains_any(latest, ANAPHORA_MARKERS) {
        return Some(last_user_contents(messages, ANAPHORA_TURNS).join("\n"));
    }

    Some(latest.to_owned())
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    markers.iter().any(|marker| lowered.contains(marker))
}
