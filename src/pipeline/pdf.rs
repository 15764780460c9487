//! PDF text extraction: one text unit per selected page via pdfium.
//!
//! pdfium is bound through `pdfium-auto`, which downloads and caches the
//! platform library on first use (or uses `PDFIUM_LIB_PATH`). The C++
//! library is not async-safe, so all work runs inside `spawn_blocking`.

use crate::config::PageSelection;
use crate::error::AnkifyError;
use crate::output::TextUnit;
use pdfium_render::prelude::PdfPageIndex;
use std::path::Path;
use tracing::{debug, info, warn};

/// Extract the text layer of the selected pages.
///
/// Units are returned in page order with 1-based ids. Pages whose text
/// layer is empty (scans, figures) are skipped with a warning.
pub async fn extract_pages(
    pdf_path: &Path,
    pages: &PageSelection,
    password: Option<&str>,
) -> Result<Vec<TextUnit>, AnkifyError> {
    let path = pdf_path.to_path_buf();
    let selection = pages.clone();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        extract_pages_blocking(&path, &selection, password.as_deref())
    })
    .await
    .map_err(|e| AnkifyError::Internal(format!("PDF extraction task panicked: {}", e)))?
}

/// Blocking implementation of page text extraction.
fn extract_pages_blocking(
    pdf_path: &Path,
    selection: &PageSelection,
    password: Option<&str>,
) -> Result<Vec<TextUnit>, AnkifyError> {
    check_pdf_magic(pdf_path)?;

    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| AnkifyError::PdfiumBindingFailed(e.to_string()))?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                AnkifyError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                AnkifyError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            AnkifyError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let indices = selection.to_indices(total_pages);
    if indices.is_empty() {
        return Err(AnkifyError::PageOutOfRange {
            page: first_requested_page(selection),
            total: total_pages,
        });
    }

    let mut units = Vec::with_capacity(indices.len());
    for idx in indices {
        let page = pages
            .get(idx as PdfPageIndex)
            .map_err(|e| AnkifyError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let text = page
            .text()
            .map_err(|e| AnkifyError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?
            .all();

        if text.trim().is_empty() {
            warn!("Page {} has no text layer; skipping", idx + 1);
            continue;
        }
        debug!("Page {}: {} chars", idx + 1, text.len());
        units.push(TextUnit::new(idx + 1, text));
    }

    Ok(units)
}

fn check_pdf_magic(path: &Path) -> Result<(), AnkifyError> {
    use std::io::Read;
    let mut magic = [0u8; 4];
    let mut f = std::fs::File::open(path).map_err(|_| AnkifyError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(AnkifyError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Page number to report when a selection matches no page.
fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) | PageSelection::Range(p, _) => *p,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}
