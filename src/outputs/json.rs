//! JSON archive record.
//!
//! Each run's [`Report`] is serialized next to its HTML archive page as
//! `archive/YYYY-MM-DD.json`, so later tooling can rebuild pages or compute
//! trends without re-fetching anything.

use crate::error::RenderError;
use crate::models::Report;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize a report as pretty-printed JSON.
///
/// The record carries the full [`Report`], enrichment included, so the HTML
/// pages can be rebuilt from it with identical output.
///
/// # Examples
///
/// ```ignore
/// let json = archive_record(&report)?;
/// let back: Report = serde_json::from_str(&json)?;
/// assert_eq!(back, report);
/// ```
pub fn archive_record(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Write the archive record for `report` to `path`.
///
/// # Arguments
///
/// * `report` - The finished report.
/// * `path` - Target file, normally `archive/YYYY-MM-DD.json`; an existing
///   file is overwritten.
///
/// # Errors
///
/// [`RenderError::Serialize`] if serialization fails and [`RenderError::Io`] if
/// the file cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_archive_record(report: &Report, path: &Path) -> Result<(), RenderError> {
    let json = archive_record(report)?;
    fs::write(path, json).await.map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(articles = report.articles.len(), "Wrote JSON archive record");
    Ok(())
}
