//! # edgequake-ankify
//!
//! Turn text files, PDFs and web pages into Anki flashcards with an LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text / PDF / URL
//!  │
//!  ├─ 1. Input      read the document into text units (one per PDF page)
//!  ├─ 2. Chunk      split units larger than the request budget
//!  ├─ 3. Summarize  one LLM call per chunk, concatenated
//!  ├─ 4. Generate   one LLM call per unit: "make N cards, Q:/A: format"
//!  ├─ 5. Parse      tolerant Q/A parsing into card records
//!  └─ 6. Export     question,answer,tag CSV ready for Anki import
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ankify::{ankify, AnkifyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = AnkifyConfig::builder().card_count(5).default_tag("biology").build()?;
//!     let output = ankify("chapter1.pdf", &config).await?;
//!     for card in &output.cards {
//!         println!("Q: {}\nA: {}\n", card.question, card.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ankify` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-ankify = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod ankify;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use ankify::{ankify, ankify_sync, ankify_to_file, build_pipeline, resolve_provider, Pipeline};
pub use config::{AnkifyConfig, AnkifyConfigBuilder, FailurePolicy, InputKind, PageSelection};
pub use error::{AnkifyError, UnitError};
pub use export::{cards_to_csv, write_csv};
pub use output::{AnkifyOutput, CardRecord, CardSet, ParsedReply, RunStats, TextUnit, UnitResult};
pub use pipeline::llm::{Completion, CompletionModel, LlmCompletionModel};
pub use pipeline::parse::parse_reply;
pub use progress::{AnkifyProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{ankify_stream, stream_units, UnitStream};
