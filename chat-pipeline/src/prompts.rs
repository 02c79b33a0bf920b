//! System prompts for the draft and enhancement completions.

/// Full assistant prompt used when retrieval context may follow.
pub const DRAFT_SYSTEM_PROMPT_RAG: &str = "あなたはマンション管理組合の運営を支援するアシスタントです。\
管理規約・理事会運営・修繕計画に関する質問に、簡潔かつ正確な日本語で回答してください。\
規約上の根拠が不明な場合は、その旨を明示してください。";

/// Lighter prompt for requests that opted out of retrieval.
pub const DRAFT_SYSTEM_PROMPT_PLAIN: &str = "あなたはマンション管理組合のアシスタントです。\
質問に簡潔な日本語で回答してください。";

pub const ENHANCE_SYSTEM_PROMPT: &str = "あなたは回答の校閲者です。\
提供された管理規約の抜粋だけを根拠として、元の回答をより正確に書き直してください。\
抜粋に含まれない事実を付け加えてはいけません。回答本文のみを返してください。";

pub fn draft_system_prompt(rag_enabled: bool) -> &'static str {
    if rag_enabled {
        DRAFT_SYSTEM_PROMPT_RAG
    } else {
        DRAFT_SYSTEM_PROMPT_PLAIN
    }
}

/// User-turn content for the enhancement call.
pub fn enhancement_input(draft: &str, context: &str) -> String {
    format!(
        "規約の抜粋:\n==================\n{context}\n\n元の回答:\n==================\n{draft}"
    )
}
