//! One complete run: load → fetch → aggregate → enrich → render.

use crate::aggregate::aggregate;
use crate::api::{DeepSeekClient, Enricher, RetryEnricher};
use crate::config::{PipelineSettings, load_sources};
use crate::enrichment::enrich_articles;
use crate::error::PipelineError;
use crate::feeds::FeedFetcher;
use crate::models::{Article, Report, UNCATEGORIZED};
use crate::outputs::html::ReportStats;
use crate::outputs::{ReportPaths, write_report};
use chrono::Utc;
use itertools::Itertools;
use std::time::Instant;
use tracing::{info, instrument};

const TOP_SOURCES: usize = 10;

/// What a finished run produced, for the closing log lines.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub sources: usize,
    pub failed_sources: Vec<String>,
    /// Articles fetched before de-duplication.
    pub fetched: usize,
    /// Articles in the report.
    pub articles: usize,
    /// Articles that received an enrichment rather than the fallback.
    pub enriched: usize,
    pub average_score: f64,
    /// `(category, count)`, most frequent first.
    pub categories: Vec<(String, usize)>,
    /// `(source, count)`, most frequent first, at most ten.
    pub top_sources: Vec<(String, usize)>,
    pub paths: ReportPaths,
}

fn ranked_counts<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    labels
        .counts()
        .into_iter()
        .sorted_by(|(a_name, a_n), (b_name, b_n)| b_n.cmp(a_n).then_with(|| a_name.cmp(b_name)))
        .map(|(name, n)| (name.to_string(), n))
        .collect()
}

impl RunSummary {
    fn new(
        sources: usize,
        failed_sources: Vec<String>,
        fetched: usize,
        articles: &[Article],
        paths: ReportPaths,
    ) -> Self {
        let stats = ReportStats::from_articles(articles);
        let mut top_sources = ranked_counts(articles.iter().map(|a| a.source_name.as_str()));
        top_sources.truncate(TOP_SOURCES);
        Self {
            sources,
            failed_sources,
            fetched,
            articles: stats.total,
            enriched: articles
                .iter()
                .filter(|a| a.category_label() != UNCATEGORIZED)
                .count(),
            average_score: stats.average_score,
            categories: ranked_counts(articles.iter().map(Article::category_label)),
            top_sources,
            paths,
        }
    }

    /// Emit the run summary at `info` level.
    pub fn log(&self) {
        info!(
            sources = self.sources,
            failed_sources = self.failed_sources.len(),
            fetched = self.fetched,
            articles = self.articles,
            enriched = self.enriched,
            average_score = %format!("{:.1}", self.average_score),
            "Run summary"
        );
        for (category, count) in &self.categories {
            info!(%category, count, "Category distribution");
        }
        for (source, count) in &self.top_sources {
            info!(%source, count, "Top source");
        }
        info!(
            report = %self.paths.latest_html.display(),
            archive = %self.paths.archive_html.display(),
            "Report published"
        );
    }
}

/// Run the pipeline with the DeepSeek client configured in `settings`.
///
/// With no API key no client is built and enrichment falls back for every
/// article.
pub async fn run(settings: &PipelineSettings) -> Result<RunSummary, PipelineError> {
    let client = DeepSeekClient::from_settings(&settings.enrichment)?;
    let enricher = client.map(|c| RetryEnricher::from_settings(c, &settings.enrichment));
    run_with(settings, enricher.as_ref()).await
}

/// Run the pipeline with any enricher.
#[instrument(level = "info", skip_all, fields(config = %settings.config_path.display()))]
pub async fn run_with<E: Enricher>(
    settings: &PipelineSettings,
    enricher: Option<&E>,
) -> Result<RunSummary, PipelineError> {
    let t0 = Instant::now();

    let sources = load_sources(&settings.config_path)?;
    let fetcher = FeedFetcher::new(&settings.fetch)?;

    let outcome = fetcher.fetch_all(&sources).await;
    let fetched = outcome.articles.len();

    let articles = aggregate(outcome.articles, settings.max_articles);
    let articles = enrich_articles(articles, enricher, settings.enrichment.concurrency).await;

    let report = Report::new(Utc::now(), articles);
    let paths = write_report(&report, &settings.output_dir, settings.site_url.as_deref()).await?;

    let summary = RunSummary::new(
        sources.len(),
        outcome.failed_sources,
        fetched,
        &report.articles,
        paths,
    );
    summary.log();
    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Run finished");
    Ok(summary)
}
