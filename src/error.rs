//! Error types for the edgequake-ankify library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AnkifyError`] — **Fatal**: the run cannot proceed (bad input file,
//!   provider not configured, model call failed under the default fail-fast
//!   policy). Returned as `Err(AnkifyError)` from the top-level `ankify*`
//!   functions.
//!
//! * [`UnitError`] — **Non-fatal**: a single text unit failed while the run
//!   was configured with [`crate::config::FailurePolicy::CollectPartial`].
//!   Stored inside [`crate::output::UnitResult`] so callers keep the cards of
//!   every unit that did succeed.
//!
//! Malformed blocks in a model reply are neither: the parser drops them and
//! reports the count in [`crate::output::UnitResult::skipped_blocks`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-ankify library.
#[derive(Debug, Error)]
pub enum AnkifyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a usable file path or URL.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// HTTP URL was syntactically valid but the download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file was forced to PDF mode but does not start with `%PDF`.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium could not extract the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// The document yielded no text at all (scanned PDF, empty file, …).
    #[error("No text could be extracted from '{input}'")]
    NoTextExtracted { input: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model invocation failed: transport error, non-success status, or
    /// the per-call deadline expired. Never retried.
    #[error("Model call failed: {detail}")]
    ModelCall { detail: String },

    /// The model answered successfully but produced no completion text.
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// Every unit failed under `CollectPartial`; there is nothing to write.
    #[error("All {total} text units failed.\nFirst error: {first_error}")]
    AllUnitsFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first PDF input.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnkifyError {
    /// `true` for failures of the model collaborator (call or empty reply).
    pub fn is_model_failure(&self) -> bool {
        matches!(self, AnkifyError::ModelCall { .. } | AnkifyError::EmptyResponse)
    }
}

/// A non-fatal error for a single text unit.
///
/// Only produced under [`crate::config::FailurePolicy::CollectPartial`];
/// the default fail-fast policy returns the underlying [`AnkifyError`].
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum UnitError {
    /// A model call for this unit failed (summary or generation step).
    #[error("Unit {unit}: model call failed: {detail}")]
    ModelCallFailed { unit: usize, detail: String },

    /// The generation call returned no completion text.
    #[error("Unit {unit}: model returned an empty response")]
    EmptyResponse { unit: usize },

    /// Any other failure while processing the unit.
    #[error("Unit {unit}: {detail}")]
    Other { unit: usize, detail: String },
}

impl UnitError {
    /// Record a fatal error as a per-unit failure.
    pub fn from_fatal(unit: usize, err: &AnkifyError) -> Self {
        match err {
            AnkifyError::ModelCall { detail } => UnitError::ModelCallFailed {
                unit,
                detail: detail.clone(),
            },
            AnkifyError::EmptyResponse => UnitError::EmptyResponse { unit },
            other => UnitError::Other {
                unit,
                detail: other.to_string(),
            },
        }
    }

    /// The unit this error belongs to.
    pub fn unit(&self) -> usize {
        match self {
            UnitError::ModelCallFailed { unit, .. }
            | UnitError::EmptyResponse { unit }
            | UnitError::Other { unit, .. } => *unit,
        }
    }
}
