//! Pipeline stages for document-to-flashcard conversion.
//!
//! Each submodule implements one step and is testable on its own; the
//! model is reached only through [`llm::CompletionModel`], so every stage
//! after input can be exercised with a stub.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ clean ──▶ chunk ──▶ summarize ──▶ generate ──▶ parse
//! (file/PDF/URL)      (tokens)   (LLM × n)     (LLM × 1)    (Q/A records)
//! ```
//!
//! 1. [`input`] / [`pdf`] — read the document into text units
//! 2. [`clean`] — normalise extracted text, strip HTML
//! 3. [`chunk`] — split units above the request budget, sized by [`tokens`]
//! 4. [`summarize`] — one summary call per chunk, concatenated
//! 5. [`generate`] — one card-generation call per unit
//! 6. [`parse`] — tolerant Q/A parsing of the reply

pub mod chunk;
pub mod clean;
pub mod generate;
pub mod input;
pub mod llm;
pub mod parse;
pub mod pdf;
pub mod summarize;
pub mod tokens;
