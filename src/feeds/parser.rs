//! Syndication parsing: turns an RSS/Atom document into raw [`Article`]s.

use crate::error::FetchError;
use crate::models::{Article, FeedSource};
use crate::utils::{html_to_text, truncate_chars};
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use tracing::debug;
use url::Url;

/// Longest plain-text description kept per article.
pub const RAW_SUMMARY_MAX_CHARS: usize = 2000;

const UNTITLED: &str = "Untitled";

/// Parse a feed body into articles attributed to `source`.
///
/// Entries without a usable link are skipped. Entries without any date are
/// stamped with `fetched_at`.
///
/// # Arguments
///
/// * `source` - The registry entry the body was downloaded from; its URL
///   resolves relative links.
/// * `body` - Raw RSS 2.0, RSS 1.0 or Atom bytes.
/// * `fetched_at` - Time of the fetch pass.
///
/// # Errors
///
/// [`FetchError::Parse`] when the body is not a feed at all.
pub fn parse_feed(
    source: &FeedSource,
    body: &[u8],
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Article>, FetchError> {
    let feed = parser::parse(body).map_err(|e| FetchError::Parse {
        source_name: source.name.clone(),
        message: e.to_string(),
    })?;

    let base = Url::parse(&source.url).ok();
    let mut articles = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        match entry_to_article(entry, source, base.as_ref(), fetched_at) {
            Some(article) => articles.push(article),
            None => debug!(source = %source.name, "Skipping entry without link"),
        }
    }
    Ok(articles)
}

fn entry_to_article(
    entry: Entry,
    source: &FeedSource,
    base: Option<&Url>,
    fetched_at: DateTime<Utc>,
) -> Option<Article> {
    let link = entry_link(&entry, base)?;

    let title = entry
        .title
        .as_ref()
        .map(|t| html_to_text(&t.content))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let body = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_deref())
        .filter(|b| !b.trim().is_empty())
        .or_else(|| entry.summary.as_ref().map(|s| s.content.as_str()))
        .unwrap_or_default();
    let raw_summary = truncate_chars(&html_to_text(body), RAW_SUMMARY_MAX_CHARS);

    let published_at = entry.published.or(entry.updated).unwrap_or(fetched_at);

    let author = entry
        .authors
        .first()
        .map(|a| a.name.trim().to_string())
        .filter(|n| !n.is_empty());

    let tags = entry
        .categories
        .into_iter()
        .map(|c| c.label.unwrap_or(c.term))
        .filter(|t| !t.trim().is_empty())
        .collect();

    Some(Article {
        title,
        link,
        published_at,
        source_name: source.name.clone(),
        source_category: source.category.clone(),
        raw_summary,
        author,
        tags,
        category: None,
        ai_summary: None,
        score: None,
        keywords: Vec::new(),
        reasoning: None,
    })
}

/// Pick the article URL: the `alternate` link if present, else the first
/// link, else an id that is itself an http(s) URL. Relative links are resolved
/// against the feed URL.
fn entry_link(entry: &Entry, base: Option<&Url>) -> Option<String> {
    let href = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|r| r == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim())
        .filter(|h| !h.is_empty())
        .or_else(|| {
            let id = entry.id.trim();
            (id.starts_with("http://") || id.starts_with("https://")).then_some(id)
        })?;

    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
        }
        Err(_) => None,
    }
}
