//! Data models for feed sources, articles, and reports.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FeedSource`]: One configured RSS/Atom feed
//! - [`Article`]: A feed entry, later enriched with AI-derived fields
//! - [`Enrichment`]: The category/summary/score returned by the enrichment API
//! - [`Report`]: The ordered, timestamped collection that gets rendered

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned to articles that could not be enriched.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Upper bound of the importance score.
pub const MAX_SCORE: u8 = 100;

/// A configured feed.
///
/// Loaded once at startup from the feed configuration file and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedSource {
    /// Display name used in logs and in the report.
    pub name: String,
    /// The feed URL (http or https).
    pub url: String,
    /// Editorial category of the source itself (e.g. "Tech Media").
    #[serde(default = "default_source_category")]
    pub category: String,
    /// Disabled sources are dropped when the configuration is loaded.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Language of the source, as an ISO 639-1 code.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_source_category() -> String {
    "Other".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

/// A single news item.
///
/// Created by the feed fetcher with the raw fields populated, then enriched
/// in place. The renderer only reads it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    pub title: String,
    /// Identifies the article within one run.
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
    pub source_category: String,
    /// Plain-text description or content taken from the feed.
    pub raw_summary: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Category terms attached to the entry by the feed itself.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl Article {
    /// Attach an enrichment result.
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) {
        self.category = Some(enrichment.category);
        self.ai_summary = Some(enrichment.summary).filter(|s| !s.is_empty());
        self.score = Some(enrichment.score.min(MAX_SCORE));
        self.keywords = enrichment.keywords;
        self.reasoning = enrichment.reasoning;
    }

    /// Mark the article as unenriched.
    pub fn apply_fallback(&mut self) {
        self.category = Some(UNCATEGORIZED.to_string());
        self.ai_summary = None;
        self.score = Some(0);
        self.keywords.clear();
        self.reasoning = None;
    }

    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }

    pub fn score_value(&self) -> u8 {
        self.score.unwrap_or(0)
    }

    /// Text used as the prompt body for enrichment.
    pub fn enrichment_text(&self) -> String {
        format!(
            "Title: {}\nSource: {}\nContent: {}",
            self.title, self.source_name, self.raw_summary
        )
    }
}

/// Result of enriching one article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Enrichment {
    pub category: String,
    pub summary: String,
    /// Importance in `0..=100`.
    pub score: u8,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// One run's output: every article that made it through aggregation, in
/// recency order, stamped with the generation time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub articles: Vec<Article>,
}

impl Report {
    pub fn new(generated_at: DateTime<Utc>, articles: Vec<Article>) -> Self {
        Self {
            generated_at,
            articles,
        }
    }

    /// Archive key, `YYYY-MM-DD` in UTC.
    pub fn date_key(&self) -> String {
        self.generated_at.format("%Y-%m-%d").to_string()
    }
}
