//! Prompts for correction and vision transcription.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the correction behaviour (e.g.
//!    tightening the no-new-content rule) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled messages
//!    directly without spinning up a real LLM, making prompt regressions easy
//!    to catch.
//!
//! Callers can override the correction system prompt via
//! [`crate::config::TranscriptConfig::system_prompt`]; the constants here are
//! used only when no override is provided.

/// Default system prompt for the per-page correction call.
///
/// The neighbor-isolation rule matters most: previous/next page text is
/// disambiguation context only and must never be copied or paraphrased into
/// the output, otherwise concurrent pages would duplicate content at every
/// page boundary.
pub const CORRECTION_SYSTEM_PROMPT: &str = "\
You are an expert OCR text corrector. Correct misspellings, diacritics, \
and punctuation errors based on context. Preserve paragraph structure, language, \
and meaning. Do not invent new content; only fix recognition errors. \
The PREVIOUS and NEXT page texts, when present, are disambiguation context only: \
never copy or paraphrase them into your answer. \
Return only the corrected text of the CURRENT page.";

/// System prompt for the vision transcription fallback.
pub const VISION_SYSTEM_PROMPT: &str =
    "You are a meticulous OCR transcriber for document page images.";

/// Base instruction accompanying the page images in the vision fallback.
/// Neighbor guidance is appended by [`vision_instruction`] only for the
/// neighbor images actually attached.
pub const VISION_USER_INSTRUCTION: &str = "\
Transcribe the text from the CURRENT page image. Return only the text that visually appears on
the CURRENT page. Preserve original language, accents, and punctuation; do not summarize or invent content.";

/// Section label preceding previous-page context (text or image).
pub const PREV_LABEL: &str = "=== PREVIOUS PAGE (context only) ===";
/// Section label preceding the current page (the one to correct/transcribe).
pub const CURRENT_LABEL: &str = "=== CURRENT PAGE ===";
/// Section label preceding next-page context (text or image).
pub const NEXT_LABEL: &str = "=== NEXT PAGE (context only) ===";

/// Build the instruction for a vision transcription request.
///
/// Vision APIs attach images as an ordered list on one user message, so the
/// labelling has to live in the text: this names which attached image is
/// context and which is the page to transcribe, matching whatever neighbors
/// actually exist.
/// The instruction must never reference neighbor images that were not
/// attached: telling the model to consult an absent PREVIOUS image on the
/// first page invites hallucinated context.
pub fn vision_instruction(has_prev: bool, has_next: bool) -> String {
    let mut order: Vec<&str> = Vec::with_capacity(3);
    if has_prev {
        order.push("the PREVIOUS page (context only)");
    }
    order.push("the CURRENT page (to transcribe)");
    if has_next {
        order.push("the NEXT page (context only)");
    }

    let context = match (has_prev, has_next) {
        (true, true) => Some("the PREVIOUS and NEXT page images"),
        (true, false) => Some("the PREVIOUS page image"),
        (false, true) => Some("the NEXT page image"),
        (false, false) => None,
    };

    let mut text = String::from(VISION_USER_INSTRUCTION);
    if let Some(ctx) = context {
        text.push_str(&format!(
            "\nUse {ctx} only as context to resolve broken words or lines across page boundaries."
        ));
    }
    format!(
        "{text}\n\nImages are attached in this order: {}.",
        order.join(", then ")
    )
}

/// Build the user message for a correction call.
///
/// Neighbor sections are omitted entirely when empty, so a single-page
/// document sends only the current page and the model never sees misleading
/// empty context blocks.
pub fn correction_user_message(current: &str, prev: &str, next: &str) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if !prev.is_empty() {
        parts.push(format!("{PREV_LABEL}\n{prev}"));
    }
    parts.push(format!("{CURRENT_LABEL}\n{current}"));
    if !next.is_empty() {
        parts.push(format!("{NEXT_LABEL}\n{next}"));
    }
    parts.join("\n\n")
}
