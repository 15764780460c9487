//! Ask the model for flashcards about one (possibly summarised) text.

use super::llm::{Completion, CompletionModel};
use super::tokens::{estimate_tokens, truncate_to_tokens};
use crate::error::AnkifyError;
use crate::prompts::CardPrompt;
use tracing::warn;

/// Request `card_count` cards about `text` with a single model call and
/// return the raw reply.
///
/// Text estimated above `ceiling_tokens` is truncated first. That only
/// happens when the model ignored the summary budget; it is logged.
pub async fn generate_cards(
    model: &dyn CompletionModel,
    text: &str,
    card_count: usize,
    ceiling_tokens: usize,
) -> Result<Completion, AnkifyError> {
    let estimate = estimate_tokens(text);
    let text = if estimate > ceiling_tokens {
        warn!(
            "Text of ~{} tokens exceeds the generation ceiling of {}; truncating",
            estimate, ceiling_tokens
        );
        truncate_to_tokens(text, ceiling_tokens)
    } else {
        text
    };

    let prompt = CardPrompt { text, card_count }.render();
    model.complete(&prompt).await
}
