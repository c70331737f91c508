//! Error types for each stage of the pipeline.
//!
//! Only [`ConfigError`] and [`RenderError`] abort a run. [`FetchError`] and
//! [`EnrichmentError`] are logged by the stage that produced them and the
//! pipeline continues with degraded data.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Startup failures. Raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read feed configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed JSON in feed configuration {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed YAML in feed configuration {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("feed source '{name}' has an invalid URL '{url}': {reason}")]
    InvalidSource {
        name: String,
        url: String,
        reason: String,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// A single feed could not be retrieved or parsed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {source_name} timed out")]
    Timeout { source_name: String },

    #[error("request to {source_name} failed: {error}")]
    Request {
        source_name: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{source_name} returned HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("{source_name} is not a valid RSS/Atom feed: {message}")]
    Parse {
        source_name: String,
        message: String,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(source_name: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout {
                source_name: source_name.to_string(),
            }
        } else {
            FetchError::Request {
                source_name: source_name.to_string(),
                error,
            }
        }
    }
}

/// The enrichment API could not produce a usable answer for one article.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("enrichment request timed out")]
    Timeout,

    #[error("enrichment request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("enrichment API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed enrichment response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            EnrichmentError::Timeout
        } else {
            EnrichmentError::Request(error)
        }
    }
}

/// The report, the sole required output, could not be produced.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize archive record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to build RSS feed: {0}")]
    Feed(#[source] io::Error),
}

/// Fatal outcome of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_mentions_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("config/rss_sources.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("config/rss_sources.json"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_status_errors_render_code() {
        let fetch = FetchError::Status {
            source_name: "Hacker News".to_string(),
            status: 503,
        };
        assert_eq!(fetch.to_string(), "Hacker News returned HTTP 503");

        let enrich = EnrichmentError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(enrich.to_string(), "enrichment API returned HTTP 500: boom");
    }

    #[test]
    fn test_pipeline_error_is_transparent() {
        let inner = ConfigError::InvalidSource {
            name: "x".to_string(),
            url: "ftp://x".to_string(),
            reason: "unsupported scheme".to_string(),
        };
        let expected = inner.to_string();
        let err: PipelineError = inner.into();
        assert_eq!(err.to_string(), expected);
    }
}
