//! Token-count heuristic used to plan request sizes.
//!
//! The estimate is one token per [`CHARS_PER_TOKEN`] characters. It is only a
//! planning number: the chunker and the generation ceiling use it to decide
//! when to split or cut, and nothing downstream assumes it matches the
//! provider's tokenizer.

/// Average characters per token for English prose.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the size of `text` in model tokens: `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Cut `text` to at most `max_tokens` estimated tokens, on a char boundary.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
