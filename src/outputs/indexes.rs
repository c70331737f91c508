//! Archive index page.
//!
//! `archive/index.html` is rebuilt on every run from whatever dated pages are
//! present in the archive directory, so it stays correct even if old reports
//! are removed by hand.

use chrono::NaiveDate;
use html_escape::encode_double_quoted_attribute;
use std::fmt::Write;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Dates of every `YYYY-MM-DD.html` page in `archive_dir`, newest first.
pub async fn list_archive_dates(archive_dir: &Path) -> io::Result<Vec<NaiveDate>> {
    let mut dates = Vec::new();
    let mut entries = fs::read_dir(archive_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".html")) else {
            continue;
        };
        match NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
            Ok(date) => dates.push(date),
            Err(_) => debug!(file = %stem, "Ignoring non-report file"),
        }
    }
    dates.sort_unstable_by(|a, b| b.cmp(a));
    Ok(dates)
}

/// Render the archive listing.
pub fn render_archive_index(dates: &[NaiveDate]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str("<title>Tech News Digest Archive</title>\n");
    out.push_str(
        "<style>body{font-family:-apple-system,BlinkMacSystemFont,\"Segoe UI\",Roboto,Arial,sans-serif;\
max-width:640px;margin:2rem auto;padding:0 1rem;color:#111827}\
a{color:#2563eb;text-decoration:none}li{margin:.35rem 0}</style>\n",
    );
    out.push_str("</head>\n<body>\n<h1>Archive</h1>\n");
    out.push_str("<p><a href=\"../index.html\">&larr; Latest report</a></p>\n");

    if dates.is_empty() {
        out.push_str("<p>No archived reports yet.</p>\n");
    } else {
        out.push_str("<ul>\n");
        for date in dates {
            let key = date.format("%Y-%m-%d").to_string();
            let href = format!("{key}.html");
            let _ = writeln!(
                out,
                "<li><a href=\"{}\">{key}</a></li>",
                encode_double_quoted_attribute(&href)
            );
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</body>\n</html>\n");
    out
}

/// Rebuild `archive/index.html` from the directory contents.
#[instrument(level = "info", skip_all, fields(archive_dir = %archive_dir.display()))]
pub async fn write_archive_index(archive_dir: &Path) -> io::Result<()> {
    let dates = list_archive_dates(archive_dir).await?;
    let path = archive_dir.join("index.html");
    fs::write(&path, render_archive_index(&dates)).await?;
    info!(reports = dates.len(), path = %path.display(), "Updated archive index");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_dated_pages_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        for name in [
            "2025-03-12.html",
            "2025-03-14.html",
            "2025-03-13.html",
            "2025-03-14.json",
            "index.html",
            "notes.html",
        ] {
            std::fs::write(tmp.path().join(name), "").unwrap();
        }

        let dates = list_archive_dates(tmp.path()).await.unwrap();
        let keys: Vec<_> = dates.iter().map(|d| d.to_string()).collect();
        assert_eq!(keys, vec!["2025-03-14", "2025-03-13", "2025-03-12"]);
    }

    #[tokio::test]
    async fn test_write_index_links_every_report() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("2025-01-02.html"), "").unwrap();
        std::fs::write(tmp.path().join("2025-01-03.html"), "").unwrap();

        write_archive_index(tmp.path()).await.unwrap();

        let html = std::fs::read_to_string(tmp.path().join("index.html")).unwrap();
        let newer = html.find("href=\"2025-01-03.html\"").unwrap();
        let older = html.find("href=\"2025-01-02.html\"").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn test_empty_archive() {
        assert!(render_archive_index(&[]).contains("No archived reports yet."));
    }
}
