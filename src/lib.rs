//! # News Sentinel
//!
//! Collects technology-news RSS/Atom feeds, asks a DeepSeek-compatible
//! chat-completion API to categorize, summarize and score each article, and
//! publishes the result as a static HTML digest with a dated archive.
//!
//! ## Architecture
//!
//! One invocation runs the pipeline once:
//! 1. **Config**: load the feed sources ([`config`])
//! 2. **Fetching**: download and parse every feed concurrently ([`feeds`])
//! 3. **Aggregation**: merge duplicates, order by recency, cap ([`aggregate`])
//! 4. **Enrichment**: category, summary and score per article ([`api`], [`enrichment`])
//! 5. **Output**: HTML, JSON archive, archive index and RSS ([`outputs`])
//!
//! Failing feeds and failing enrichment calls degrade the report but never
//! fail the run. Only configuration and report-writing errors are fatal.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod feeds;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod utils;

pub use error::{ConfigError, EnrichmentError, FetchError, PipelineError, RenderError};
pub use models::{Article, Enrichment, FeedSource, Report};
pub use pipeline::{RunSummary, run, run_with};
