//! Output generation for HTML, JSON, and index files.
//!
//! # Submodules
//!
//! - [`html`]: Renders a [`Report`] as a self-contained HTML page
//! - [`json`]: Serializes the report as the dated archive record
//! - [`indexes`]: Rebuilds the archive listing page
//! - [`feed`]: RSS 2.0 feed of the latest report
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── index.html               # latest report
//! ├── feed.xml                 # RSS of the latest report
//! └── archive/
//!     ├── index.html           # listing of all dated reports
//!     ├── 2025-05-06.html
//!     └── 2025-05-06.json
//! ```
//!
//! Only the current date's archive files are (re)written; older dates are
//! never touched. The first three files are required and a failure there is
//! a [`RenderError`]. The archive listing and the feed are best-effort.

pub mod feed;
pub mod html;
pub mod indexes;
pub mod json;

use crate::error::RenderError;
use crate::models::Report;
use crate::utils::ensure_writable_dir;
use html::{PageLocation, render_html};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Files produced by [`write_report`]. Optional entries are `None` when that
/// best-effort output failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub latest_html: PathBuf,
    pub archive_html: PathBuf,
    pub archive_json: PathBuf,
    pub archive_index: Option<PathBuf>,
    pub feed: Option<PathBuf>,
}

async fn write_file(path: &Path, contents: String) -> Result<(), RenderError> {
    fs::write(path, contents)
        .await
        .map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), "Wrote file");
    Ok(())
}

/// Write every output for `report` under `output_dir`.
///
/// # Arguments
///
/// * `report` - The enriched report for this run.
/// * `output_dir` - Root of the published site; created if missing.
/// * `site_url` - Public base URL used for the channel link in `feed.xml`.
///
/// # Returns
///
/// The paths written. `archive_index` and `feed` are `None` when those
/// best-effort outputs failed; the failure is logged and the run goes on.
///
/// # Errors
///
/// Any failure writing `index.html` or the dated archive HTML/JSON.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display(), date = %report.date_key()))]
pub async fn write_report(
    report: &Report,
    output_dir: &Path,
    site_url: Option<&str>,
) -> Result<ReportPaths, RenderError> {
    let archive_dir = output_dir.join("archive");
    ensure_writable_dir(&archive_dir)
        .await
        .map_err(|source| RenderError::Io {
            path: archive_dir.clone(),
            source,
        })?;

    let date = report.date_key();
    let latest_html = output_dir.join("index.html");
    let archive_html = archive_dir.join(format!("{date}.html"));
    let archive_json = archive_dir.join(format!("{date}.json"));

    write_file(&latest_html, render_html(report, PageLocation::Latest)).await?;
    write_file(&archive_html, render_html(report, PageLocation::Archive)).await?;
    json::write_archive_record(report, &archive_json).await?;

    let archive_index = match indexes::write_archive_index(&archive_dir).await {
        Ok(()) => Some(archive_dir.join("index.html")),
        Err(e) => {
            error!(error = %e, "Failed to update archive index; continuing");
            None
        }
    };

    let feed_path = output_dir.join("feed.xml");
    let feed = match feed::render_rss(report, site_url) {
        Ok(xml) => match write_file(&feed_path, xml).await {
            Ok(()) => Some(feed_path),
            Err(e) => {
                error!(error = %e, "Failed to write RSS feed; continuing");
                None
            }
        },
        Err(e) => {
            error!(error = %e, "Failed to build RSS feed; continuing");
            None
        }
    };

    Ok(ReportPaths {
        latest_html,
        archive_html,
        archive_json,
        archive_index,
        feed,
    })
}
