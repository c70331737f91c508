//! Classification prompt, response parsing and the article enrichment pass.
//!
//! The model is asked for a single JSON object:
//!
//! ```json
//! {"category": "...", "summary": "...", "hot_score": 0-100,
//!  "keywords": ["..."], "reasoning": "..."}
//! ```
//!
//! [`parse_analysis`] tolerates Markdown code fences, leading prose, scores
//! given as strings and keywords given as a comma-separated string. Anything
//! it cannot make sense of is an [`EnrichmentError::Malformed`], which the
//! enrichment pass turns into the fallback values.

use crate::api::Enricher;
use crate::error::EnrichmentError;
use crate::models::{Article, Enrichment, MAX_SCORE, UNCATEGORIZED};
use crate::utils::{collapse_whitespace, looks_truncated, strip_code_fences};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Report sections, in display order.
pub const KNOWN_CATEGORIES: [&str; 5] = [
    "Breaking News",
    "Industry Trends",
    "Product Launches",
    "Technical Deep Dives",
    "Opinion & Analysis",
];

/// Labels the model sometimes answers with, mapped onto [`KNOWN_CATEGORIES`].
const CATEGORY_ALIASES: [(&str, &str); 9] = [
    ("breaking", "Breaking News"),
    ("重大新闻", "Breaking News"),
    ("industry", "Industry Trends"),
    ("行业动态", "Industry Trends"),
    ("product launch", "Product Launches"),
    ("产品发布", "Product Launches"),
    ("technical", "Technical Deep Dives"),
    ("技术干货", "Technical Deep Dives"),
    ("观点评论", "Opinion & Analysis"),
];

const MAX_KEYWORDS: usize = 5;

pub const SYSTEM_PROMPT: &str = "You are a technology news editor. You classify news \
articles, write concise summaries and rate how important each story is to a technical \
audience. Always answer with a single JSON object and nothing else.";

/// The per-article user message.
pub fn user_prompt(article_text: &str) -> String {
    format!(
        "Analyze the following article.\n\n{article_text}\n\n\
Respond with a JSON object with exactly these fields:\n\
- \"category\": one of {categories}\n\
- \"summary\": a summary of at most 100 words\n\
- \"hot_score\": an integer from 0 to 100 rating importance and timeliness\n\
- \"keywords\": up to 5 keywords\n\
- \"reasoning\": one sentence explaining the score",
        categories = KNOWN_CATEGORIES.iter().map(|c| format!("\"{c}\"")).join(", ")
    )
}

#[derive(Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default, alias = "score")]
    hot_score: Option<Value>,
    #[serde(default)]
    keywords: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parse the model's message content into an [`Enrichment`].
pub fn parse_analysis(content: &str) -> Result<Enrichment, EnrichmentError> {
    let json = extract_object(strip_code_fences(content));
    let raw: RawAnalysis = serde_json::from_str(json).map_err(|e| {
        if looks_truncated(&e) {
            EnrichmentError::Malformed(format!("analysis JSON was cut off: {e}"))
        } else {
            EnrichmentError::Malformed(format!("analysis is not a JSON object: {e}"))
        }
    })?;

    let category = raw
        .category
        .map(|c| collapse_whitespace(&c))
        .filter(|c| !c.is_empty())
        .map(|c| canonical_category(&c))
        .ok_or_else(|| EnrichmentError::Malformed("missing category".to_string()))?;

    let score = raw
        .hot_score
        .as_ref()
        .and_then(score_from_value)
        .ok_or_else(|| EnrichmentError::Malformed("missing or non-numeric score".to_string()))?;

    Ok(Enrichment {
        category,
        summary: raw.summary.map(|s| collapse_whitespace(&s)).unwrap_or_default(),
        score,
        keywords: raw.keywords.map(keywords_from_value).unwrap_or_default(),
        reasoning: raw
            .reasoning
            .map(|r| collapse_whitespace(&r))
            .filter(|r| !r.is_empty()),
    })
}

/// Narrow `s` to its outermost `{...}` when the model wrapped it in prose.
fn extract_object(s: &str) -> &str {
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if start < end => &s[start..=end],
        _ => s,
    }
}

fn canonical_category(label: &str) -> String {
    if label.eq_ignore_ascii_case(UNCATEGORIZED) {
        return UNCATEGORIZED.to_string();
    }
    if let Some(known) = KNOWN_CATEGORIES
        .iter()
        .find(|k| k.eq_ignore_ascii_case(label))
    {
        return known.to_string();
    }
    let lower = label.to_lowercase();
    CATEGORY_ALIASES
        .iter()
        .find(|(alias, _)| lower.contains(alias))
        .map(|(_, known)| known.to_string())
        .unwrap_or_else(|| label.to_string())
}

fn score_from_value(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(0.0, f64::from(MAX_SCORE)) as u8)
}

fn keywords_from_value(value: Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) => s.split([',', '，']).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .iter()
        .map(|k| collapse_whitespace(k))
        .filter(|k| !k.is_empty())
        .unique_by(|k| k.to_lowercase())
        .take(MAX_KEYWORDS)
        .collect()
}

/// Enrich every article, at most `concurrency` calls in flight, keeping the
/// input order.
///
/// Without an enricher no call is made and every article gets the fallback
/// values. A failed article also gets the fallback; it never fails the pass.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub async fn enrich_articles<E: Enricher>(
    mut articles: Vec<Article>,
    enricher: Option<&E>,
    concurrency: usize,
) -> Vec<Article> {
    let Some(enricher) = enricher else {
        warn!("No API key configured; articles are left uncategorized");
        for article in &mut articles {
            article.apply_fallback();
        }
        return articles;
    };

    let enriched: Vec<(Article, bool)> = stream::iter(articles)
        .map(|mut article| async move {
            match enricher.submit(&article.enrichment_text()).await {
                Ok(enrichment) => {
                    debug!(link = %article.link, category = %enrichment.category, score = enrichment.score, "Enriched article");
                    article.apply_enrichment(enrichment);
                    (article, true)
                }
                Err(e) => {
                    warn!(link = %article.link, error = %e, "Enrichment failed; using fallback");
                    article.apply_fallback();
                    (article, false)
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let succeeded = enriched.iter().filter(|(_, ok)| *ok).count();
    info!(
        succeeded,
        fallback = enriched.len() - succeeded,
        "Enrichment pass finished"
    );
    enriched.into_iter().map(|(article, _)| article).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::article;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_plain_json() {
        let e = parse_analysis(
            r#"{"category": "Product Launches", "summary": "New chip.", "hot_score": 87,
                "keywords": ["chips", "AI"], "reasoning": "Big launch"}"#,
        )
        .unwrap();
        assert_eq!(e.category, "Product Launches");
        assert_eq!(e.summary, "New chip.");
        assert_eq!(e.score, 87);
        assert_eq!(e.keywords, vec!["chips", "AI"]);
        assert_eq!(e.reasoning.as_deref(), Some("Big launch"));
    }

    #[test]
    fn test_parse_fenced_json_with_string_score() {
        let content = "```json\n{\"category\": \"industry trends\", \"summary\": \"s\", \"hot_score\": \"64.6\"}\n```";
        let e = parse_analysis(content).unwrap();
        assert_eq!(e.category, "Industry Trends");
        assert_eq!(e.score, 65);
        assert!(e.keywords.is_empty());
    }

    #[test]
    fn test_parse_prose_wrapped_object() {
        let content = "Here is the analysis: {\"category\": \"重大新闻\", \"summary\": \"x\", \"score\": 91} Hope it helps.";
        let e = parse_analysis(content).unwrap();
        assert_eq!(e.category, "Breaking News");
        assert_eq!(e.score, 91);
    }

    #[test]
    fn test_score_is_clamped() {
        let high = parse_analysis(r#"{"category": "X", "hot_score": 180}"#).unwrap();
        assert_eq!(high.score, 100);
        let low = parse_analysis(r#"{"category": "X", "hot_score": -5}"#).unwrap();
        assert_eq!(low.score, 0);
    }

    #[test]
    fn test_unknown_category_is_kept() {
        let e = parse_analysis(r#"{"category": "Security", "hot_score": 10}"#).unwrap();
        assert_eq!(e.category, "Security");
    }

    #[test]
    fn test_uncategorized_label_folds_to_fallback_section() {
        for label in ["Uncategorized", "UNCATEGORIZED", " uncategorized "] {
            let content = format!(r#"{{"category": "{label}", "hot_score": 3}}"#);
            let e = parse_analysis(&content).unwrap();
            assert_eq!(e.category, UNCATEGORIZED, "{label}");
        }
    }

    #[test]
    fn test_keywords_deduped_and_capped() {
        let e = parse_analysis(
            r#"{"category": "X", "hot_score": 1, "keywords": ["a", "A", "b", "c", "d", "e", "f"]}"#,
        )
        .unwrap();
        assert_eq!(e.keywords, vec!["a", "b", "c", "d", "e"]);

        let e = parse_analysis(r#"{"category": "X", "hot_score": 1, "keywords": "rust, wasm ,"}"#)
            .unwrap();
        assert_eq!(e.keywords, vec!["rust", "wasm"]);
    }

    #[test]
    fn test_malformed_responses() {
        for content in [
            "not json at all",
            r#"{"summary": "no category", "hot_score": 5}"#,
            r#"{"category": "X"}"#,
            r#"{"category": "X", "hot_score": "high"}"#,
            r#"{"category": "X", "hot_score": 5"#,
            r#"{"category": "X", "hot_score": "NaN"}"#,
            r#"{"category": "X", "hot_score": "inf"}"#,
        ] {
            let err = parse_analysis(content).unwrap_err();
            assert!(matches!(err, EnrichmentError::Malformed(_)), "{content}");
        }
    }

    #[test]
    fn test_user_prompt_lists_categories() {
        let prompt = user_prompt("Title: T");
        assert!(prompt.starts_with("Analyze the following article.\n\nTitle: T"));
        for c in KNOWN_CATEGORIES {
            assert!(prompt.contains(c));
        }
    }

    /// Answers from the article text; any text containing "fail" errors.
    struct Scripted {
        calls: AtomicUsize,
    }

    impl Enricher for Scripted {
        async fn submit(&self, text: &str) -> Result<Enrichment, EnrichmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("fail") {
                return Err(EnrichmentError::Status {
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(Enrichment {
                category: "Technical Deep Dives".to_string(),
                summary: format!("summary of {}", text.lines().next().unwrap_or_default()),
                score: 70,
                keywords: vec!["rust".to_string()],
                reasoning: None,
            })
        }
    }

    #[tokio::test]
    async fn test_enrich_preserves_order_and_falls_back() {
        let mut bad = article("https://example.com/2", 2);
        bad.title = "will fail".to_string();
        let input = vec![
            article("https://example.com/1", 3),
            bad,
            article("https://example.com/3", 1),
        ];
        let stub = Scripted {
            calls: AtomicUsize::new(0),
        };

        let out = enrich_articles(input, Some(&stub), 2).await;
        let links: Vec<_> = out.iter().map(|a| a.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3"
            ]
        );
        assert_eq!(out[0].category_label(), "Technical Deep Dives");
        assert_eq!(out[0].score, Some(70));
        assert_eq!(out[1].category_label(), UNCATEGORIZED);
        assert_eq!(out[1].score, Some(0));
        assert!(out[1].ai_summary.is_none());
        assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_enrich_without_enricher_uses_fallback() {
        let input = vec![article("https://example.com/1", 3)];
        let out = enrich_articles::<Scripted>(input, None, 4).await;
        assert_eq!(out[0].category.as_deref(), Some(UNCATEGORIZED));
        assert_eq!(out[0].score, Some(0));
    }
}
