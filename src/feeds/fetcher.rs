//! Concurrent feed retrieval.

use crate::config::FetchSettings;
use crate::error::{ConfigError, FetchError};
use crate::feeds::parser::parse_feed;
use crate::models::{Article, FeedSource};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, error, info, instrument};

const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.8";

/// What a fetch pass produced: the articles from every feed that worked and
/// the names of the feeds that did not.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub articles: Vec<Article>,
    pub failed_sources: Vec<String>,
}

/// Shared HTTP client for all feeds of a run.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    concurrency: usize,
}

impl FeedFetcher {
    /// Build the shared client: feed `Accept` header, user agent and a
    /// whole-request timeout, so a stalled server counts as a failure.
    ///
    /// # Errors
    ///
    /// [`ConfigError::HttpClient`] when the TLS backend cannot be set up.
    pub fn new(settings: &FetchSettings) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            client,
            concurrency: settings.concurrency.max(1),
        })
    }

    /// Download and parse one feed.
    #[instrument(level = "info", skip_all, fields(source = %source.name, url = %source.url))]
    pub async fn fetch_feed(
        &self,
        source: &FeedSource,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<Article>, FetchError> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&source.name, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: source.name.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&source.name, e))?;
        debug!(bytes = body.len(), "Downloaded feed");

        let articles = parse_feed(source, &body, fetched_at)?;
        info!(count = articles.len(), "Parsed feed entries");
        Ok(articles)
    }

    /// Fetch every source, at most `concurrency` at a time.
    ///
    /// Results are gathered in `sources` order whatever order the downloads
    /// finish in. A failing source is logged and skipped; it never fails the
    /// pass.
    ///
    /// # Arguments
    ///
    /// * `sources` - The enabled feeds from the registry.
    ///
    /// # Returns
    ///
    /// The articles of every feed that worked, and the sorted names of the
    /// feeds that did not.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn fetch_all(&self, sources: &[FeedSource]) -> FetchOutcome {
        let fetched_at = Utc::now();

        let results: Vec<(&FeedSource, Result<Vec<Article>, FetchError>)> = stream::iter(sources)
            .map(|source| async move { (source, self.fetch_feed(source, fetched_at).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut outcome = FetchOutcome::default();
        for (source, result) in results {
            match result {
                Ok(mut articles) => outcome.articles.append(&mut articles),
                Err(e) => {
                    error!(source = %source.name, error = %e, "Feed fetch failed; skipping");
                    outcome.failed_sources.push(source.name.clone());
                }
            }
        }
        outcome.failed_sources.sort();

        info!(
            articles = outcome.articles.len(),
            failed = outcome.failed_sources.len(),
            "Fetched all feeds"
        );
        outcome
    }
}
