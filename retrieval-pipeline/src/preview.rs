//! Short keyword-bearing excerpts of ranked chunks for UI consumption.

/// Extracts up to `max_segments` sentences or list items containing a
/// keyword; falls back to a truncated prefix when nothing matches.
pub fn build_preview(
    text: &str,
    keywords: &[String],
    max_segments: usize,
    fallback_chars: usize,
) -> String {
    let segments: Vec<&str> = text
        .split(['。', '\n'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    let matching: Vec<&str> = segments
        .iter()
        .filter(|segment| {
            let lowered = segment.to_lowercase();
            keywords.iter().any(|kw| lowered.contains(kw.as_str()))
        })
        .take(max_segments)
        .copied()
        .collect();

    if !matching.is_empty() {
        let mut preview = matching.join("。");
        preview.push('。');
        return preview;
    }

    truncate_chars(text, fallback_chars)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.trim().to_owned();
    }
    let mut prefix: String = text.chars().take(max_chars).collect();
    prefix.push('…');
    prefix
}
