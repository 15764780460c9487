//! Split oversized text into budget-sized chunks.
//!
//! Chunks are cut at raw character offsets, not at word or sentence
//! boundaries. The token estimate is too rough for boundary-aware splitting
//! to buy anything, and each chunk is summarised independently anyway.

use super::tokens::estimate_tokens;

/// Split `text` into `ceil(estimate / max_tokens)` chunks of roughly equal
/// character length.
///
/// Returns a single chunk equal to `text` when it already fits. The chunks
/// concatenate back to `text` exactly, none is empty, and there is always at
/// least one (an empty input yields one empty chunk). A zero budget is
/// treated as 1.
pub fn split_into_chunks(text: &str, max_tokens_per_chunk: usize) -> Vec<&str> {
    let budget = max_tokens_per_chunk.max(1);
    let estimate = estimate_tokens(text);
    if estimate <= budget {
        return vec![text];
    }

    let chunk_count = estimate.div_ceil(budget);
    // Byte offset of every char, plus the end of the string.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = offsets.len() - 1;

    // chunk_count <= estimate <= char_count, so every slice gets ≥ 1 char.
    (0..chunk_count)
        .map(|i| {
            let start = offsets[i * char_count / chunk_count];
            let end = offsets[(i + 1) * char_count / chunk_count];
            &text[start..end]
        })
        .collect()
}
