//! Input resolution: turn a user-supplied path or URL into text units.
//!
//! Three sources are supported:
//!
//! | Kind | Units | Extraction |
//! |------|-------|------------|
//! | text | one (id 1) | whole file as UTF-8 |
//! | PDF  | one per selected page (id = page number) | pdfium text layer, see [`super::pdf`] |
//! | URL  | one (id 1) | `<body>` text with markup stripped |
//!
//! Every unit's text goes through [`clean_text`] before it is returned.

use super::clean::{clean_text, html_to_text};
use super::pdf;
use crate::config::{AnkifyConfig, InputKind};
use crate::error::AnkifyError;
use crate::output::TextUnit;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Decide how to read `input` when the kind is [`InputKind::Auto`].
pub fn detect_kind(input: &str) -> InputKind {
    if is_url(input) {
        return InputKind::Url;
    }
    let path = Path::new(input);
    let has_pdf_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if has_pdf_extension || starts_with_pdf_magic(path) {
        InputKind::Pdf
    } else {
        InputKind::Text
    }
}

fn starts_with_pdf_magic(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| &magic == b"%PDF")
        .unwrap_or(false)
}

/// Load `input` as an ordered list of text units.
///
/// Blank units (e.g. image-only PDF pages) are left out; if nothing remains
/// the call fails with [`AnkifyError::NoTextExtracted`].
pub async fn load_text_units(
    input: &str,
    config: &AnkifyConfig,
) -> Result<Vec<TextUnit>, AnkifyError> {
    let kind = match config.input_kind {
        InputKind::Auto => detect_kind(input),
        explicit => explicit,
    };
    debug!("Reading '{}' as {:?}", input, kind);

    let units = match kind {
        InputKind::Url => {
            let text = fetch_url_text(&with_scheme(input), config.download_timeout_secs).await?;
            vec![TextUnit::new(1, text)]
        }
        InputKind::Pdf => {
            let path = check_readable(input)?;
            pdf::extract_pages(&path, &config.pages, config.password.as_deref()).await?
        }
        InputKind::Text | InputKind::Auto => {
            let path = check_readable(input)?;
            let text = read_text_file(&path).await?;
            vec![TextUnit::new(1, text)]
        }
    };

    let units: Vec<TextUnit> = units
        .into_iter()
        .map(|u| TextUnit::new(u.id, clean_text(&u.text)))
        .filter(|u| !u.text.is_empty())
        .collect();

    if units.is_empty() {
        return Err(AnkifyError::NoTextExtracted {
            input: input.to_string(),
        });
    }
    info!("Loaded {} text unit(s) from '{}'", units.len(), input);
    Ok(units)
}

/// Prefix `http://` when a URL input has no scheme.
fn with_scheme(input: &str) -> String {
    if is_url(input) {
        input.to_string()
    } else {
        format!("http://{input}")
    }
}

/// Validate a local path exists and is readable.
fn check_readable(path_str: &str) -> Result<PathBuf, AnkifyError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(AnkifyError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(AnkifyError::PermissionDenied { path })
        }
        Err(_) => Err(AnkifyError::FileNotFound { path }),
    }
}

async fn read_text_file(path: &Path) -> Result<String, AnkifyError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            AnkifyError::InvalidInput {
                input: path.display().to_string(),
                reason: "file is not valid UTF-8 text (use --type pdf for PDFs)".into(),
            }
        } else {
            AnkifyError::Internal(format!("Failed to read '{}': {}", path.display(), e))
        }
    })
}

/// Download a web page and return its body text.
async fn fetch_url_text(url: &str, timeout_secs: u64) -> Result<String, AnkifyError> {
    info!("Fetching page: {}", url);

    if reqwest::Url::parse(url).is_err() {
        return Err(AnkifyError::InvalidInput {
            input: url.to_string(),
            reason: "not a valid HTTP/HTTPS URL".into(),
        });
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnkifyError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AnkifyError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AnkifyError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AnkifyError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let html = response
        .text()
        .await
        .map_err(|e| AnkifyError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok(html_to_text(&html))
}
