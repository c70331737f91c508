//! Cross-feed merge: collapse duplicate links, order by recency, cap the count.

use crate::models::Article;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info, instrument};
use url::Url;

/// Default cap on articles carried into enrichment and the report.
pub const DEFAULT_MAX_ARTICLES: usize = 100;

const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid"];

/// Reduce a link to the key used for duplicate detection.
///
/// The key ignores case, the scheme, a leading `www.`, the fragment, a
/// trailing slash and tracking query parameters, so `https://Example.com/a/?utm_source=x#top`
/// and `http://example.com/a` collide.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     normalize_link("https://www.Example.com/News/?utm_source=rss#top"),
///     "example.com/news"
/// );
/// ```
pub fn normalize_link(link: &str) -> String {
    let trimmed = link.trim();
    let Ok(url) = Url::parse(trimmed) else {
        let lower = trimmed.to_lowercase();
        let rest = lower
            .strip_prefix("https://")
            .or_else(|| lower.strip_prefix("http://"))
            .unwrap_or(&lower);
        let rest = rest.split('#').next().unwrap_or_default();
        return rest.trim_end_matches('/').to_string();
    };

    let mut key = String::new();
    if let Some(host) = url.host_str() {
        key.push_str(host.trim_start_matches("www."));
    }
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(url.path().trim_end_matches('/'));

    let query: Vec<String> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| if v.is_empty() { k.into_owned() } else { format!("{k}={v}") })
        .collect();
    if !query.is_empty() {
        key.push('?');
        key.push_str(&query.join("&"));
    }

    key.to_lowercase()
}

fn is_tracking_param(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name.as_str())
}

fn supersedes(candidate: &Article, kept: &Article) -> bool {
    candidate
        .published_at
        .cmp(&kept.published_at)
        .then_with(|| kept.source_name.cmp(&candidate.source_name))
        .then_with(|| kept.link.cmp(&candidate.link))
        .is_gt()
}

/// Merge articles from every feed into the report order.
///
/// Each normalized link survives once, as its most recently published copy.
/// Copies published at the same instant are settled by the smallest
/// `(source_name, link)`, so the input order never changes the result. The
/// output is sorted newest first, ties broken by link, then truncated to
/// `max_articles`.
#[instrument(level = "info", skip_all, fields(input = articles.len(), max_articles = max_articles))]
pub fn aggregate(articles: Vec<Article>, max_articles: usize) -> Vec<Article> {
    let mut by_key: HashMap<String, Article> = HashMap::with_capacity(articles.len());
    let mut duplicates = 0usize;

    for article in articles {
        match by_key.entry(normalize_link(&article.link)) {
            Entry::Vacant(slot) => {
                slot.insert(article);
            }
            Entry::Occupied(mut slot) => {
                duplicates += 1;
                if supersedes(&article, slot.get()) {
                    debug!(link = %article.link, "Replacing duplicate");
                    slot.insert(article);
                }
            }
        }
    }

    let mut merged: Vec<Article> = by_key.into_values().collect();
    merged.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.link.cmp(&b.link))
    });
    let dropped = merged.len().saturating_sub(max_articles);
    merged.truncate(max_articles);

    info!(
        kept = merged.len(),
        duplicates,
        truncated = dropped,
        "Aggregated articles"
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::article;

    #[test]
    fn test_normalize_link_ignores_scheme_case_and_tracking() {
        let a = normalize_link("https://www.Example.com/News/Item/?utm_source=rss&id=7#comments");
        let b = normalize_link("http://example.com/news/item?id=7&fbclid=abc");
        assert_eq!(a, b);
        assert_eq!(a, "example.com/news/item?id=7");
    }

    #[test]
    fn test_normalize_link_keeps_distinct_paths() {
        assert_ne!(
            normalize_link("https://example.com/a"),
            normalize_link("https://example.com/b")
        );
        assert_ne!(
            normalize_link("https://example.com/a?id=1"),
            normalize_link("https://example.com/a?id=2")
        );
    }

    #[test]
    fn test_normalize_link_unparseable_falls_back_to_text() {
        assert_eq!(normalize_link("  /Relative/Path/ "), "/relative/path");
    }

    #[test]
    fn test_duplicate_keeps_most_recent() {
        let older = article("https://example.com/story", 8);
        let mut newer = article("http://EXAMPLE.com/story/", 11);
        newer.source_name = "Mirror".to_string();

        let out = aggregate(vec![older, newer], DEFAULT_MAX_ARTICLES);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_name, "Mirror");
        assert_eq!(out[0].published_at, article("x", 11).published_at);
    }

    #[test]
    fn test_equal_timestamps_independent_of_input_order() {
        let mut from_a = article("https://news.example.com/story", 9);
        from_a.source_name = "Feed A".to_string();
        let mut from_b = article("http://news.example.com/story?utm_source=rss", 9);
        from_b.source_name = "Feed B".to_string();

        let a_first = aggregate(vec![from_a.clone(), from_b.clone()], DEFAULT_MAX_ARTICLES);
        let b_first = aggregate(vec![from_b, from_a], DEFAULT_MAX_ARTICLES);
        assert_eq!(a_first.len(), 1);
        assert_eq!(a_first, b_first);
        assert_eq!(a_first[0].source_name, "Feed A");
        assert_eq!(a_first[0].link, "https://news.example.com/story");
    }

    #[test]
    fn test_equal_timestamps_same_source_smallest_link_wins() {
        let plain = article("https://example.com/same", 9);
        let tracked = article("https://example.com/same?utm_medium=feed", 9);

        let out = aggregate(vec![tracked.clone(), plain.clone()], DEFAULT_MAX_ARTICLES);
        assert_eq!(out[0].link, plain.link);
        let out = aggregate(vec![plain.clone(), tracked], DEFAULT_MAX_ARTICLES);
        assert_eq!(out[0].link, plain.link);
    }

    #[test]
    fn test_sorted_newest_first_with_link_tiebreak() {
        let input = vec![
            article("https://example.com/c", 5),
            article("https://example.com/b", 9),
            article("https://example.com/a", 9),
            article("https://example.com/d", 12),
        ];
        let links: Vec<_> = aggregate(input, DEFAULT_MAX_ARTICLES)
            .into_iter()
            .map(|a| a.link)
            .collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/d",
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c",
            ]
        );
    }

    #[test]
    fn test_two_feeds_with_overlap() {
        // Feed A: two entries; feed B repeats A's first link.
        let a1 = article("https://a.example/one", 10);
        let a2 = article("https://a.example/two", 7);
        let b1 = article("https://a.example/one", 6);

        let out = aggregate(vec![a1, a2, b1], DEFAULT_MAX_ARTICLES);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].link, "https://a.example/one");
        assert_eq!(out[0].published_at, article("x", 10).published_at);
        assert_eq!(out[1].link, "https://a.example/two");
    }

    #[test]
    fn test_truncates_to_max() {
        let input = (0..10)
            .map(|h| article(&format!("https://example.com/{h}"), h))
            .collect();
        let out = aggregate(input, 3);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].link, "https://example.com/9");
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new(), DEFAULT_MAX_ARTICLES).is_empty());
    }
}
