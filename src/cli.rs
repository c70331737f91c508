//! Command-line interface definitions for News Sentinel.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option has a default, and the API settings can also come from
//! environment variables, so a scheduled job can run the binary bare.

use clap::Parser;
use news_sentinel::aggregate::DEFAULT_MAX_ARTICLES;
use news_sentinel::config::{
    DEFAULT_API_URL, DEFAULT_CONFIG_PATH, DEFAULT_MODEL, DEFAULT_OUTPUT_DIR, EnrichmentSettings,
    FetchSettings, PipelineSettings,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line arguments for the News Sentinel application.
///
/// # Examples
///
/// ```sh
/// # Defaults: config/rss_sources.json in, docs/ out, key from the environment
/// DEEPSEEK_API_KEY=sk-... news_sentinel
///
/// # Custom locations and a smaller report
/// news_sentinel --config feeds.yaml --output-dir public --max-articles 50
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the feed source list (JSON or YAML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory the report is written to
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Maximum number of articles in the report
    #[arg(long, default_value_t = DEFAULT_MAX_ARTICLES)]
    pub max_articles: usize,

    /// Number of feeds fetched concurrently
    #[arg(long, default_value_t = 4)]
    pub fetch_concurrency: usize,

    /// Number of enrichment requests in flight
    #[arg(long, default_value_t = 4)]
    pub enrich_concurrency: usize,

    /// Per-feed request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Per-request enrichment API timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub api_timeout_secs: u64,

    /// Retries after a failed enrichment request
    #[arg(long, default_value_t = 2)]
    pub max_retries: usize,

    /// Linear backoff step between enrichment retries, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// API key for the chat-completion service; enrichment is skipped without one
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chat-completion endpoint
    #[arg(long, env = "DEEPSEEK_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Model name sent with each request
    #[arg(long, env = "DEEPSEEK_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Public URL the output directory is served from (used in feed.xml)
    #[arg(long, env = "NEWS_SENTINEL_SITE_URL")]
    pub site_url: Option<String>,

    /// File that receives a copy of the log, appended to on every run
    #[arg(long, env = "NEWS_SENTINEL_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log to stdout only; overrides --log-file
    #[arg(long)]
    pub no_log_file: bool,
}

pub const DEFAULT_LOG_FILE: &str = "news_sentinel.log";

impl Cli {
    /// Where the log copy goes, if anywhere.
    pub fn log_path(&self) -> Option<&Path> {
        (!self.no_log_file).then_some(self.log_file.as_path())
    }

    /// Convert the parsed arguments into the library's run settings.
    ///
    /// # Returns
    ///
    /// A [`PipelineSettings`] whose API key is `None` when the key is missing
    /// or blank, which turns enrichment off.
    pub fn into_settings(self) -> PipelineSettings {
        let fetch = FetchSettings {
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            concurrency: self.fetch_concurrency,
            ..FetchSettings::default()
        };
        let enrichment = EnrichmentSettings {
            api_url: self.api_url,
            model: self.model,
            timeout: Duration::from_secs(self.api_timeout_secs),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            concurrency: self.enrich_concurrency,
            ..EnrichmentSettings::default()
        }
        .with_api_key(self.api_key);

        PipelineSettings {
            config_path: self.config,
            output_dir: self.output_dir,
            max_articles: self.max_articles,
            site_url: self.site_url.filter(|u| !u.trim().is_empty()),
            fetch,
            enrichment,
        }
    }
}
