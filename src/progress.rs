//! Progress-callback trait for per-unit run events.
//!
//! Inject an [`Arc<dyn AnkifyProgressCallback>`] via
//! [`crate::config::AnkifyConfigBuilder::progress_callback`] to receive
//! events as the pipeline processes each text unit (a PDF page, a text file,
//! a web page).
//!
//! # Example
//!
//! ```rust
//! use edgequake_ankify::{AnkifyProgressCallback, AnkifyConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CardCounter {
//!     cards: AtomicUsize,
//! }
//!
//! impl AnkifyProgressCallback for CardCounter {
//!     fn on_unit_complete(&self, unit_id: usize, _total: usize, card_count: usize) {
//!         self.cards.fetch_add(card_count, Ordering::SeqCst);
//!         eprintln!("unit {unit_id}: {card_count} cards");
//!     }
//! }
//!
//! let counter = Arc::new(CardCounter { cards: AtomicUsize::new(0) });
//!
//! let config = AnkifyConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnkifyProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each text unit.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` units are
/// processed concurrently and the per-unit methods may be called from
/// different tasks. All methods default to no-ops.
pub trait AnkifyProgressCallback: Send + Sync {
    /// Called once before the first unit is processed.
    fn on_run_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called when a unit starts, before it is chunked.
    fn on_unit_start(&self, unit_id: usize, total_units: usize) {
        let _ = (unit_id, total_units);
    }

    /// Called after a unit's oversized text was summarised.
    ///
    /// * `chunk_count` — number of chunks that were summarised
    fn on_unit_summarized(&self, unit_id: usize, chunk_count: usize) {
        let _ = (unit_id, chunk_count);
    }

    /// Called when a unit's cards were generated and parsed.
    ///
    /// * `card_count` — cards kept after parsing
    fn on_unit_complete(&self, unit_id: usize, total_units: usize, card_count: usize) {
        let _ = (unit_id, total_units, card_count);
    }

    /// Called when a unit fails.
    fn on_unit_error(&self, unit_id: usize, total_units: usize, error: &str) {
        let _ = (unit_id, total_units, error);
    }

    /// Called once after all units have been attempted (not called when a
    /// fail-fast run aborts).
    fn on_run_complete(&self, total_units: usize, success_count: usize) {
        let _ = (total_units, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnkifyProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnkifyConfig`].
pub type ProgressCallback = Arc<dyn AnkifyProgressCallback>;
