//! HTML rendering of a [`Report`].
//!
//! The page is a single self-contained document with inline CSS. Rendering is
//! a pure function of the report: no clock, no environment, no I/O, so the
//! same report always yields byte-identical output.

use crate::enrichment::KNOWN_CATEGORIES;
use crate::models::{Article, Report, UNCATEGORIZED};
use crate::utils::truncate_chars;
use html_escape::{encode_double_quoted_attribute, encode_text};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Characters of raw feed text shown when no AI summary exists.
const RAW_SUMMARY_PREVIEW_CHARS: usize = 200;

const STYLE: &str = r#"
:root { --accent: #2563eb; --muted: #6b7280; --card: #ffffff; --bg: #f3f4f6; }
* { box-sizing: border-box; }
body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif; background: var(--bg); color: #111827; line-height: 1.6; }
header { background: linear-gradient(135deg, #1e3a8a, #2563eb); color: #fff; padding: 2rem 1rem; text-align: center; }
header h1 { margin: 0 0 .25rem; font-size: 2rem; }
header p { margin: 0; opacity: .85; }
main { max-width: 960px; margin: 0 auto; padding: 1.5rem 1rem; }
.stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 1rem; margin-bottom: 2rem; }
.stat { background: var(--card); border-radius: 10px; padding: 1rem; text-align: center; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
.stat .value { display: block; font-size: 1.75rem; font-weight: 700; color: var(--accent); }
.stat .label { color: var(--muted); font-size: .9rem; }
section.category { margin-bottom: 2rem; }
section.category h2 { border-left: 4px solid var(--accent); padding-left: .75rem; font-size: 1.3rem; }
section.category h2 .count { color: var(--muted); font-weight: 400; font-size: 1rem; }
article { background: var(--card); border-radius: 10px; padding: 1rem 1.25rem; margin-bottom: 1rem; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
article h3 { margin: 0 0 .35rem; font-size: 1.1rem; }
article h3 a { color: inherit; text-decoration: none; }
article h3 a:hover { color: var(--accent); }
.score { float: right; background: var(--accent); color: #fff; border-radius: 999px; padding: 0 .6rem; font-size: .85rem; font-weight: 600; }
.meta { color: var(--muted); font-size: .85rem; margin-bottom: .5rem; }
.reasoning { color: var(--muted); font-style: italic; font-size: .85rem; }
.keywords { margin-top: .5rem; }
.keyword { display: inline-block; background: #e0e7ff; color: #3730a3; border-radius: 6px; padding: 0 .5rem; margin: 0 .35rem .35rem 0; font-size: .8rem; }
.empty { text-align: center; color: var(--muted); padding: 3rem 0; }
footer { text-align: center; color: var(--muted); font-size: .85rem; padding: 2rem 1rem; }
footer a { color: var(--accent); }
"#;

/// Where a rendered page will live, which decides its relative links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLocation {
    /// `index.html` at the output root.
    Latest,
    /// `archive/YYYY-MM-DD.html`.
    Archive,
}

impl PageLocation {
    fn archive_index_href(self) -> &'static str {
        match self {
            PageLocation::Latest => "archive/index.html",
            PageLocation::Archive => "index.html",
        }
    }

    fn latest_href(self) -> &'static str {
        match self {
            PageLocation::Latest => "index.html",
            PageLocation::Archive => "../index.html",
        }
    }

    fn feed_href(self) -> &'static str {
        match self {
            PageLocation::Latest => "feed.xml",
            PageLocation::Archive => "../feed.xml",
        }
    }
}

/// Headline numbers shown above the article list.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStats {
    pub total: usize,
    pub average_score: f64,
    pub sources: usize,
    pub categories: usize,
}

impl ReportStats {
    pub fn from_articles(articles: &[Article]) -> Self {
        let total = articles.len();
        let average_score = if total == 0 {
            0.0
        } else {
            articles
                .iter()
                .map(|a| f64::from(a.score_value()))
                .sum::<f64>()
                / total as f64
        };
        Self {
            total,
            average_score,
            sources: articles.iter().map(|a| a.source_name.as_str()).unique().count(),
            categories: articles.iter().map(Article::category_label).unique().count(),
        }
    }
}

/// One report section.
#[derive(Debug)]
pub struct CategoryGroup<'a> {
    pub name: &'a str,
    pub articles: Vec<&'a Article>,
}

/// Section ordering key: known categories first in their fixed order, then
/// any other label alphabetically, `uncategorized` last.
fn category_rank(name: &str) -> (u8, usize, &str) {
    if name == UNCATEGORIZED {
        return (2, 0, "");
    }
    match KNOWN_CATEGORIES.iter().position(|k| *k == name) {
        Some(idx) => (0, idx, ""),
        None => (1, 0, name),
    }
}

/// Group articles into report sections.
///
/// Within a section articles are ordered by score (highest first), then by
/// recency, then by link.
pub fn group_by_category(articles: &[Article]) -> Vec<CategoryGroup<'_>> {
    let mut groups: BTreeMap<(u8, usize, &str), CategoryGroup<'_>> = BTreeMap::new();
    for article in articles {
        let name = article.category_label();
        groups
            .entry(category_rank(name))
            .or_insert_with(|| CategoryGroup {
                name,
                articles: Vec::new(),
            })
            .articles
            .push(article);
    }

    groups
        .into_values()
        .map(|mut group| {
            group.articles.sort_by(|a, b| {
                b.score_value()
                    .cmp(&a.score_value())
                    .then_with(|| b.published_at.cmp(&a.published_at))
                    .then_with(|| a.link.cmp(&b.link))
            });
            group
        })
        .collect()
}

/// Render the report as a complete HTML document.
///
/// The page is self-contained (inline CSS, no scripts) and a pure function
/// of `report` and `location`: rendering the same report twice yields the
/// same bytes.
///
/// # Arguments
///
/// * `report` - The report to render.
/// * `location` - Where the page will live, which decides the relative
///   links to the archive.
///
/// # Examples
///
/// ```ignore
/// let html = render_html(&report, PageLocation::Latest);
/// assert!(html.starts_with("<!DOCTYPE html>"));
/// ```
pub fn render_html(report: &Report, location: PageLocation) -> String {
    let mut out = String::with_capacity(16 * 1024 + report.articles.len() * 1024);
    // Writing into a String cannot fail.
    let _ = write_page(&mut out, report, location);
    out
}

fn write_page(out: &mut String, report: &Report, location: PageLocation) -> fmt::Result {
    let date = report.date_key();
    let generated = report.generated_at.format("%Y-%m-%d %H:%M:%S UTC");

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(
        out,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">"
    )?;
    writeln!(out, "<title>Tech News Digest {date}</title>")?;
    writeln!(
        out,
        "<link rel=\"alternate\" type=\"application/rss+xml\" title=\"Tech News Digest\" href=\"{}\">",
        location.feed_href()
    )?;
    writeln!(out, "<style>{STYLE}</style>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;

    writeln!(out, "<header>")?;
    writeln!(out, "<h1>Tech News Digest</h1>")?;
    writeln!(out, "<p>{date} &middot; generated {generated}</p>")?;
    writeln!(out, "</header>")?;

    writeln!(out, "<main>")?;
    write_stats(out, &ReportStats::from_articles(&report.articles))?;

    if report.articles.is_empty() {
        writeln!(out, "<p class=\"empty\">No articles were collected for this run.</p>")?;
    }
    for group in group_by_category(&report.articles) {
        write_group(out, &group)?;
    }
    writeln!(out, "</main>")?;

    writeln!(out, "<footer>")?;
    writeln!(out, "<p>Generated {generated}</p>")?;
    writeln!(
        out,
        "<p><a href=\"{}\">Latest</a> &middot; <a href=\"{}\">Archive</a> &middot; <a href=\"{}\">RSS</a></p>",
        location.latest_href(),
        location.archive_index_href(),
        location.feed_href()
    )?;
    writeln!(out, "</footer>")?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

fn write_stats(out: &mut String, stats: &ReportStats) -> fmt::Result {
    writeln!(out, "<div class=\"stats\">")?;
    for (value, label) in [
        (stats.total.to_string(), "Articles"),
        (format!("{:.1}", stats.average_score), "Average score"),
        (stats.sources.to_string(), "Sources"),
        (stats.categories.to_string(), "Categories"),
    ] {
        writeln!(
            out,
            "<div class=\"stat\"><span class=\"value\">{value}</span><span class=\"label\">{label}</span></div>"
        )?;
    }
    writeln!(out, "</div>")
}

fn write_group(out: &mut String, group: &CategoryGroup<'_>) -> fmt::Result {
    writeln!(
        out,
        "<section class=\"category\" id=\"{}\">",
        category_anchor(group.name)
    )?;
    writeln!(
        out,
        "<h2>{} <span class=\"count\">({})</span></h2>",
        encode_text(group.name),
        group.articles.len()
    )?;
    for article in &group.articles {
        write_article(out, article)?;
    }
    writeln!(out, "</section>")
}

fn write_article(out: &mut String, article: &Article) -> fmt::Result {
    writeln!(out, "<article>")?;
    writeln!(
        out,
        "<span class=\"score\" title=\"Importance score\">{}</span>",
        article.score_value()
    )?;
    let title = encode_text(&article.title);
    if is_web_link(&article.link) {
        writeln!(
            out,
            "<h3><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{title}</a></h3>",
            encode_double_quoted_attribute(&article.link)
        )?;
    } else {
        writeln!(out, "<h3>{title}</h3>")?;
    }

    write!(
        out,
        "<div class=\"meta\">{} &middot; {}",
        article.published_at.format("%Y-%m-%d %H:%M UTC"),
        encode_text(&article.source_name)
    )?;
    if let Some(author) = &article.author {
        write!(out, " &middot; {}", encode_text(author))?;
    }
    writeln!(out, "</div>")?;

    let summary = match &article.ai_summary {
        Some(summary) => summary.clone(),
        None => truncate_chars(&article.raw_summary, RAW_SUMMARY_PREVIEW_CHARS),
    };
    if !summary.is_empty() {
        writeln!(out, "<p>{}</p>", encode_text(&summary))?;
    }
    if let Some(reasoning) = &article.reasoning {
        writeln!(out, "<p class=\"reasoning\">{}</p>", encode_text(reasoning))?;
    }
    if !article.keywords.is_empty() {
        write!(out, "<div class=\"keywords\">")?;
        for keyword in &article.keywords {
            write!(out, "<span class=\"keyword\">{}</span>", encode_text(keyword))?;
        }
        writeln!(out, "</div>")?;
    }
    writeln!(out, "</article>")
}

fn is_web_link(link: &str) -> bool {
    let lower = link.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

fn category_anchor(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.split('-').filter(|s| !s.is_empty()).join("-");
    format!("cat-{slug}")
}
