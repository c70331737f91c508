//! Utility functions for text cleanup, truncation, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - HTML-to-text conversion for feed descriptions
//! - Character-safe truncation for logging and display
//! - Markdown code-fence stripping for LLM responses
//! - Output directory validation

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*(.*?)\s*```\s*$").expect("valid code fence regex")
});

/// Collapse every whitespace run into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Strip markup from an HTML fragment and return its visible text.
///
/// Entities are decoded by the HTML parser. Whitespace is collapsed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(html_to_text("<p>Hello <b>world</b></p>"), "Hello world");
/// ```
pub fn html_to_text(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return collapse_whitespace(html);
    }
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

/// Keep at most `max` characters, appending `…` when something was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…", s[..idx].trim_end()),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped bytes.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
    }
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````) if present.
pub fn strip_code_fences(s: &str) -> &str {
    match CODE_FENCE.captures(s).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => s.trim(),
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the LLM response is cut off by its token limit the JSON fails with an
/// EOF error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}
