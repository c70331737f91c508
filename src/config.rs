//! Feed registry loading and run settings.
//!
//! The feed registry is a JSON array of [`FeedSource`] records. The
//! `{"sources": [...]}` wrapper is accepted as well, and files ending in
//! `.yaml`/`.yml` are read as YAML. Any problem here is fatal: the run stops
//! before touching the network.
//!
//! [`PipelineSettings`] carries everything else a run needs (paths, limits,
//! API credentials) so the library never reads the process environment.

use crate::aggregate::DEFAULT_MAX_ARTICLES;
use crate::error::ConfigError;
use crate::models::FeedSource;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config/rss_sources.json";
pub const DEFAULT_OUTPUT_DIR: &str = "docs";
pub const DEFAULT_API_URL: &str = "https://api.siliconflow.cn/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V3";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 news_sentinel";

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedConfigFile {
    List(Vec<FeedSource>),
    Wrapped { sources: Vec<FeedSource> },
}

impl FeedConfigFile {
    fn into_sources(self) -> Vec<FeedSource> {
        match self {
            FeedConfigFile::List(sources) | FeedConfigFile::Wrapped { sources } => sources,
        }
    }
}

/// Load and validate the enabled feed sources from `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_sources(path: &Path) -> Result<Vec<FeedSource>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let sources = parse_sources(path, &raw)?;
    info!(count = sources.len(), "Loaded feed sources");
    Ok(sources)
}

/// Parse registry text; the format is chosen by the file extension of `path`.
pub fn parse_sources(path: &Path, raw: &str) -> Result<Vec<FeedSource>, ConfigError> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let file: FeedConfigFile = if is_yaml {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_json::from_str(raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    };

    let mut enabled = Vec::new();
    for source in file.into_sources() {
        validate_source(&source)?;
        if source.enabled {
            enabled.push(source);
        } else {
            debug!(name = %source.name, "Skipping disabled source");
        }
    }
    Ok(enabled)
}

fn validate_source(source: &FeedSource) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidSource {
        name: source.name.clone(),
        url: source.url.clone(),
        reason: reason.to_string(),
    };

    let url = Url::parse(&source.url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("unsupported scheme"));
    }
    if url.host().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(())
}

/// HTTP settings for feed retrieval.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub timeout: Duration,
    /// Maximum number of feeds fetched at once.
    pub concurrency: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            concurrency: 4,
        }
    }
}

/// Settings for the enrichment API client.
#[derive(Clone)]
pub struct EnrichmentSettings {
    /// `None` disables enrichment entirely.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: usize,
    /// Linear backoff step: attempt `n` waits `retry_delay * n`.
    pub retry_delay: Duration,
    /// Upper bound of the random jitter added to each backoff.
    pub retry_jitter: Duration,
    /// Maximum number of in-flight enrichment calls.
    pub concurrency: usize,
}

impl EnrichmentSettings {
    /// Treats an empty or whitespace-only key as absent.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }
}

impl std::fmt::Debug for EnrichmentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentSettings")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("retry_jitter", &self.retry_jitter)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            retry_jitter: Duration::from_millis(250),
            concurrency: 4,
        }
    }
}

/// Everything a single run needs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub config_path: PathBuf,
    pub output_dir: PathBuf,
    /// Cap on the number of articles kept after aggregation.
    pub max_articles: usize,
    /// Public URL of the published site, used for absolute links in `feed.xml`.
    pub site_url: Option<String>,
    pub fetch: FetchSettings,
    pub enrichment: EnrichmentSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_articles: DEFAULT_MAX_ARTICLES,
            site_url: None,
            fetch: FetchSettings::default(),
            enrichment: EnrichmentSettings::default(),
        }
    }
}
