//! Data types that flow into and out of the ankify pipeline.
//!
//! [`TextUnit`] is what document acquisition produces; [`CardRecord`] is the
//! unit of output; [`AnkifyOutput`] bundles the ordered card set with
//! per-unit results and run statistics. All output types serialise with
//! serde so the CLI can emit them as JSON.

use crate::error::UnitError;
use serde::{Deserialize, Serialize};

/// One addressable piece of source text: a PDF page, a whole text file, or
/// the body of a web page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextUnit {
    /// 1-based page number for PDFs, `1` for single-unit documents.
    pub id: usize,
    pub text: String,
}

impl TextUnit {
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Convert an `id → text` mapping into units ordered by id.
    ///
    /// Accepts any map type, including an unordered `HashMap`.
    pub fn from_map(map: impl IntoIterator<Item = (usize, String)>) -> Vec<TextUnit> {
        let mut units: Vec<TextUnit> = map
            .into_iter()
            .map(|(id, text)| TextUnit { id, text })
            .collect();
        units.sort_by_key(|u| u.id);
        units
    }
}

/// One question/answer flashcard.
///
/// `question` and `answer` are never empty and never carry the `Q:`/`A:`
/// markers or surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub question: String,
    pub answer: String,
    pub tag: Option<String>,
}

impl CardRecord {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Cards of one run in processing order. Never deduplicated.
pub type CardSet = Vec<CardRecord>;

/// Result of parsing one model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    pub cards: Vec<CardRecord>,
    /// Blocks or fragments dropped because they had no marker, an empty
    /// field, or no matching question/answer partner.
    pub skipped_blocks: usize,
}

/// Outcome of processing a single text unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitResult {
    pub unit_id: usize,
    pub cards: Vec<CardRecord>,
    pub skipped_blocks: usize,
    /// Chunks the unit's text was split into (1 = no summarisation).
    pub chunk_count: usize,
    pub model_calls: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Set only under `FailurePolicy::CollectPartial`.
    pub error: Option<UnitError>,
}

impl UnitResult {
    pub(crate) fn failed(unit_id: usize, error: UnitError, duration_ms: u64) -> Self {
        Self {
            unit_id,
            cards: Vec::new(),
            skipped_blocks: 0,
            chunk_count: 0,
            model_calls: 0,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_units: usize,
    pub processed_units: usize,
    pub failed_units: usize,
    pub total_cards: usize,
    pub skipped_blocks: usize,
    pub model_calls: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

impl RunStats {
    /// Sum per-unit results into run statistics.
    pub fn from_units(units: &[UnitResult], total_duration_ms: u64) -> Self {
        Self {
            total_units: units.len(),
            processed_units: units.iter().filter(|u| u.is_success()).count(),
            failed_units: units.iter().filter(|u| !u.is_success()).count(),
            total_cards: units.iter().map(|u| u.cards.len()).sum(),
            skipped_blocks: units.iter().map(|u| u.skipped_blocks).sum(),
            model_calls: units.iter().map(|u| u.model_calls).sum(),
            total_input_tokens: units.iter().map(|u| u.input_tokens as u64).sum(),
            total_output_tokens: units.iter().map(|u| u.output_tokens as u64).sum(),
            total_duration_ms,
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnkifyOutput {
    /// All cards, in unit order then reply order.
    pub cards: CardSet,
    pub units: Vec<UnitResult>,
    pub stats: RunStats,
}

impl AnkifyOutput {
    /// Errors of the units that failed under `CollectPartial`.
    pub fn unit_errors(&self) -> impl Iterator<Item = &UnitError> {
        self.units.iter().filter_map(|u| u.error.as_ref())
    }
}
