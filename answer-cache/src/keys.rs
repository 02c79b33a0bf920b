use std::collections::HashSet;

// Punctuation stripped during normalization, ASCII and full-width.
const PUNCTUATION: &[char] = &[
    '?', '!', '.', ',', ';', ':', '"', '\'', '(', ')', '[', ']', '？', '！', '。', '、', '・',
    '，', '．', '「', '」', '『', '』', '（', '）', '…', '〜', '～',
];

// Interrogative endings, filler and particles removed before keyword
// comparison, longest first so that 「とは何ですか」 wins over 「とは」.
const STOP_PHRASES: &[&str] = &[
    "について教えてください",
    "について教えて",
    "を教えてください",
    "教えてください",
    "とは何ですか",
    "とはなんですか",
    "について",
    "でしょうか",
    "ください",
    "なんですか",
    "何ですか",
    "ですか",
    "とは",
    "教えて",
    "どうすれば",
    "どうやって",
    "いつ",
    "なぜ",
    "です",
    "ます",
    "の",
    "は",
    "が",
    "を",
    "に",
    "で",
    "へ",
    "と",
    "や",
    "も",
    "から",
    "まで",
    "tell me about",
    "what is",
    "please",
    "about",
    "the",
];

/// Canonicalizes a free-text question into a cache key: lowercase,
/// punctuation stripped, whitespace runs collapsed, trimmed. Idempotent.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts comparison keywords from a question: normalization, stop
/// phrase removal, whitespace split, single-character tokens dropped.
pub fn keywords(text: &str) -> Vec<String> {
    let mut working = normalize(text);
    for phrase in STOP_PHRASES {
        if working.contains(phrase) {
            working = working.replace(phrase, " ");
        }
    }

    let mut seen = HashSet::new();
    working
        .split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .filter(|token| seen.insert((*token).to_owned()))
        .map(str::to_owned)
        .collect()
}

/// Keyword-overlap ratio between two questions: `|A ∩ B| / max(|A|,|B|)`.
pub fn overlap_ratio(a: &str, b: &str) -> f32 {
    let set_a: HashSet<String> = keywords(a).into_iter().collect();
    let set_b: HashSet<String> = keywords(b).into_iter().collect();

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    intersection as f32 / set_a.len().max(set_b.len()) as f32
}

/// Scans `existing_keys` in order and returns the first key whose keyword
/// overlap with `key` reaches `threshold`. First sufficiently similar
/// wins, not most similar. Linear scan; fine at the observed cache sizes
/// (≤500 entries), an inverted keyword index is the upgrade path beyond
/// that.
pub fn find_similar<'a, I>(key: &str, existing_keys: I, threshold: f32) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let query_keywords: HashSet<String> = keywords(key).into_iter().collect();
    if query_keywords.is_empty() {
        return None;
    }

    for candidate in existing_keys {
        let candidate_keywords: HashSet<String> = keywords(candidate).into_iter().collect();
        if candidate_keywords.is_empty() {
            continue;
        }

        let intersection = query_keywords.intersection(&candidate_keywords).count();
        let ratio =
            intersection as f32 / query_keywords.len().max(candidate_keywords.len()) as f32;

        if ratio >= threshold {
            return Some(candidate.to_owned());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "管理費について教えて？",
            "  What   is  the KANRIHI?! ",
            "修繕積立金とは。",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "normalize must be idempotent");
        }
    }

    #[test]
    fn test_punctuation_and_case_variants_collide() {
        assert_eq!(
            normalize("管理費について教えて"),
            normalize("管理費について教えて？")
        );
        assert_eq!(normalize("Pet  Rules"), normalize("pet rules!"));
    }

    #[test]
    fn test_keywords_drop_stop_phrases_and_short_tokens() {
        let kws = keywords("修繕積立金について教えてください");
        assert_eq!(kws, vec!["修繕積立金".to_owned()]);

        let kws = keywords("理事会の役割");
        assert!(kws.contains(&"理事会".to_owned()));
        assert!(kws.contains(&"役割".to_owned()));
    }

    #[test]
    fn test_find_similar_matches_paraphrase() {
        let cached = vec!["修繕積立金とは"];
        let matched = find_similar(
            "修繕積立金について教えて",
            cached.iter().copied(),
            0.6,
        );
        assert_eq!(matched, Some("修繕積立金とは".to_owned()));
    }

    #[test]
    fn test_find_similar_rejects_unrelated() {
        let cached = vec!["理事会の役割"];
        let matched = find_similar("ゴミ出しのルール", cached.iter().copied(), 0.6);
        assert_eq!(matched, None);
    }

    #[test]
    fn test_find_similar_takes_first_qualifying_match() {
        // both candidates qualify; scan order decides, not max score
        let cached = vec!["管理費の使いみちとは", "管理費とは"];
        let matched = find_similar("管理費の使いみち", cached.iter().copied(), 0.5);
        assert_eq!(matched, Some("管理費の使いみちとは".to_owned()));
    }

    #[test]
    fn test_overlap_ratio_bounds() {
        assert!((overlap_ratio("管理費とは", "管理費について") - 1.0).abs() < f32::EPSILON);
        assert!(overlap_ratio("管理費とは", "ペットの飼育") < 0.01);
        assert!(overlap_ratio("", "管理費") < f32::EPSILON);
    }
}
