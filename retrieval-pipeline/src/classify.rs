//! Structural classification of retrieved regulation text.
//!
//! Pure functions over the chunk text; the patterns can be tuned without
//! touching the scoring logic that consumes the classification.

use serde::Serialize;

/// Tagged classification of one chunk.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ChunkClassification {
    /// Enumerated-definition phrasing (「◯◯とは、…をいう。」).
    pub is_definition: bool,
    /// Numbered statutory clause marker (「第◯条」).
    pub has_article: bool,
    /// Room/unit enumeration (「◯号室」), usually noise for
    /// definitional questions.
    pub is_housing_list: bool,
}

pub fn classify_chunk(text: &str) -> ChunkClassification {
    ChunkClassification {
        is_definition: is_definition(text),
        has_article: has_article_marker(text),
        is_housing_list: is_housing_list(text),
    }
}

fn is_definition(text: &str) -> bool {
    if text.contains("とは、") || text.contains("とは,") {
        return true;
    }
    text.contains("とは")
        && (text.contains("をいう") || text.contains("を言う") || text.contains("を指す"))
}

// Matches 第 + digits (ASCII, full-width or kanji numerals) + 条.
fn has_article_marker(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars.get(i) == Some(&'第') {
            let mut j = i + 1;
            let mut digits = 0;
            while j < chars.len() && chars.get(j).is_some_and(|c| is_numeral(*c)) {
                digits += 1;
                j += 1;
            }
            if digits > 0 && chars.get(j) == Some(&'条') {
                return true;
            }
        }
        i += 1;
    }
    false
}

fn is_housing_list(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    for (i, window) in chars.windows(2).enumerate() {
        if window == ['号', '室'] {
            // require a numeral in front so 「◯号室」 counts but a lone
            // mention of the word does not
            if i > 0 && chars.get(i - 1).is_some_and(|c| is_numeral(*c)) {
                return true;
            }
        }
    }
    false
}

fn is_numeral(c: char) -> bool {
    c.is_ascii_digit()
        || ('０'..='９').contains(&c)
        || matches!(c, '一' | '二' | '三' | '四' | '五' | '六' | '七' | '八' | '九' | '十' | '百')
}
