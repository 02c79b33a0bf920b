//! Second-pass answer enhancement against the ranked context.

use std::time::Duration;

use tracing::{debug, warn};

use common::{
    message::ChatMessage,
    utils::completion::{CompletionParams, CompletionProvider},
};

use crate::prompts::{enhancement_input, ENHANCE_SYSTEM_PROMPT};

/// Rewrites `draft` against `context` with one lower-temperature
/// completion. Any failure, including timeout, falls back silently to
/// the draft; enhancement must never surface an error to the caller.
pub async fn enhance_answer(
    provider: &CompletionProvider,
    draft: &str,
    context: &str,
    params: &CompletionParams,
    timeout: Duration,
) -> (String, bool) {
    let input = vec![ChatMessage::user(enhancement_input(draft, context))];

    match tokio::time::timeout(
        timeout,
        provider.complete(ENHANCE_SYSTEM_PROMPT, &input, params),
    )
    .await
    {
        Ok(Ok(revised)) if !revised.trim().is_empty() => {
            debug!("answer enhancement applied");
            (revised, true)
        }
        Ok(Ok(_)) => {
            warn!("enhancement returned empty text; keeping draft answer");
            (draft.to_owned(), false)
        }
        Ok(Err(error)) => {
            warn!(%error, "enhancement failed; keeping draft answer");
            (draft.to_owned(), false)
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "enhancement timed out; keeping draft answer");
            (draft.to_owned(), false)
        }
    }
}
