//! Prompts for summarisation and card generation.
//!
//! Prompts are built from named fields ([`SummaryPrompt`], [`CardPrompt`])
//! rather than by substituting placeholders into a template string, so a
//! missing or misspelled field is a compile error instead of a literal
//! `{text}` leaking to the model.
//!
//! Callers can override the system prompt via
//! [`crate::config::AnkifyConfig::system_prompt`]; the user-turn prompts
//! below are always used because the reply parser depends on their format.

/// Default system prompt sent before every completion.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert teacher who writes spaced-repetition flashcards.
Questions are specific and self-contained. Answers are short and factual.
Never add commentary before or after the requested output."#;

/// Asks the model to compress one chunk of a larger text.
#[derive(Debug, Clone, Copy)]
pub struct SummaryPrompt<'a> {
    /// The chunk to compress.
    pub text: &'a str,
    /// Roughly how many tokens the summary may use.
    pub target_tokens: usize,
}

impl SummaryPrompt<'_> {
    pub fn render(&self) -> String {
        format!(
            "Summarize the following text in at most {} tokens. Keep every fact, \
name, date, definition and number that a student would need to remember. \
Write plain prose without headings or bullet lists.\n\n\"\"\"{}\"\"\"",
            self.target_tokens.max(1),
            self.text
        )
    }
}

/// Asks the model for `card_count` flashcards about `text`.
///
/// The requested format is what [`crate::pipeline::parse::parse_reply`]
/// expects: `Q:` line, `A:` line, cards separated by a blank line.
#[derive(Debug, Clone, Copy)]
pub struct CardPrompt<'a> {
    pub text: &'a str,
    pub card_count: usize,
}

impl CardPrompt<'_> {
    pub fn render(&self) -> String {
        let noun = if self.card_count == 1 { "card" } else { "cards" };
        format!(
            "Make {count} Anki {noun} for the following text. Give them to me in exactly \
this format:\n\nQ: <question>\nA: <answer>\n\nSeparate cards with one blank line. \
Do not number the cards.\n\nText:\n\"\"\"{text}\"\"\"",
            count = self.card_count,
            noun = noun,
            text = self.text
        )
    }
}
