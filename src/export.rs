//! CSV export of a card set.
//!
//! Each card becomes one row `question,answer,tag` with RFC 4180 quoting,
//! which Anki's "Import File" dialog reads directly (separator: comma,
//! field 3 mapped to Tags). A card without a tag gets an empty third field.

use crate::error::AnkifyError;
use crate::output::CardRecord;
use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// `YYYY-MM-DD_HH-MM-SS.csv` for the given local time.
pub fn timestamped_file_name(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d_%H-%M-%S.csv").to_string()
}

/// Render `cards` as CSV, one line per card, in order.
pub fn cards_to_csv(cards: &[CardRecord]) -> String {
    let mut out = String::new();
    for card in cards {
        out.push_str(&escape_field(&card.question));
        out.push(',');
        out.push_str(&escape_field(&card.answer));
        out.push(',');
        out.push_str(&escape_field(card.tag.as_deref().unwrap_or("")));
        out.push('\n');
    }
    out
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write `cards` to `path` as CSV.
///
/// Parent directories are created. Uses atomic write (temp file + rename)
/// so a failed write never leaves a partial file behind.
pub async fn write_csv(cards: &[CardRecord], path: &Path) -> Result<(), AnkifyError> {
    let write_err = |e| AnkifyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, cards_to_csv(cards))
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} card(s) to {}", cards.len(), path.display());
    Ok(())
}

/// Write `cards` into `dir` under a fresh timestamped name and return the
/// path. A numeric suffix is added if a file of that name already exists.
pub async fn write_csv_in_dir(cards: &[CardRecord], dir: &Path) -> Result<PathBuf, AnkifyError> {
    let path = unused_path(dir, &timestamped_file_name(Local::now()));
    write_csv(cards, &path).await?;
    Ok(path)
}

fn unused_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let stem = file_name.trim_end_matches(".csv");
    (1..)
        .map(|n| dir.join(format!("{stem}-{n}.csv")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
