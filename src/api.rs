//! Chat-completion API access with retry and linear backoff.
//!
//! The enrichment capability is the [`Enricher`] trait: hand it the text of
//! one article, get back an [`Enrichment`] or an [`EnrichmentError`].
//!
//! - [`DeepSeekClient`]: talks to a DeepSeek-compatible `/chat/completions`
//!   endpoint over HTTPS with a bearer token
//! - [`RetryEnricher`]: decorator that retries any [`Enricher`]
//!
//! # Retry Strategy
//!
//! - `max_retries` extra attempts after the first (2 by default)
//! - Linear backoff: attempt `n` waits `retry_delay * n`
//! - Random jitter (0-250ms by default) added to each wait

use crate::config::EnrichmentSettings;
use crate::enrichment::{SYSTEM_PROMPT, parse_analysis, user_prompt};
use crate::error::{ConfigError, EnrichmentError};
use crate::models::Enrichment;
use crate::utils::{looks_truncated, truncate_for_log};
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 500;

/// Something that can enrich one article's text.
///
/// Implemented by the real HTTP client and by the retry decorator; tests
/// substitute deterministic stubs.
pub trait Enricher {
    /// Send article text for classification and receive the enrichment.
    async fn submit(&self, text: &str) -> Result<Enrichment, EnrichmentError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for a DeepSeek-compatible chat-completion API.
pub struct DeepSeekClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl DeepSeekClient {
    /// Build a client from the settings.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no API key is configured, so the caller can skip
    /// enrichment without making a single request.
    ///
    /// # Errors
    ///
    /// [`ConfigError::HttpClient`] when the HTTP client cannot be built.
    pub fn from_settings(settings: &EnrichmentSettings) -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = settings.api_key.clone() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Some(Self {
            client,
            api_key,
            api_url: settings.api_url.clone(),
            model: settings.model.clone(),
        }))
    }
}

impl fmt::Debug for DeepSeekClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepSeekClient")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

impl Enricher for DeepSeekClient {
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn submit(&self, text: &str) -> Result<Enrichment, EnrichmentError> {
        let prompt = user_prompt(text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let t0 = Instant::now();
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(
            status = status.as_u16(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = body.len(),
            "API responded"
        );

        if !status.is_success() {
            return Err(EnrichmentError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 200),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            if looks_truncated(&e) {
                EnrichmentError::Malformed(format!("truncated response body: {e}"))
            } else {
                EnrichmentError::Malformed(format!("unexpected response body: {e}"))
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EnrichmentError::Malformed("response has no choices".to_string()))?;

        parse_analysis(&content)
    }
}

/// Wrapper that adds linear-backoff retries to any [`Enricher`].
///
/// ```text
/// delay(n) = retry_delay * n + random_jitter(0..=jitter)
/// ```
pub struct RetryEnricher<T> {
    inner: T,
    max_retries: usize,
    retry_delay: Duration,
    jitter: Duration,
}

impl<T> RetryEnricher<T>
where
    T: Enricher,
{
    /// Wrap `inner` with a retry policy and the default 250 ms jitter.
    ///
    /// # Arguments
    ///
    /// * `inner` - The enricher doing the actual request.
    /// * `max_retries` - Extra attempts after the first failure; `0` means
    ///   a single attempt.
    /// * `retry_delay` - Backoff step; retry `n` waits `retry_delay * n`.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let client = DeepSeekClient::from_settings(&settings)?.unwrap();
    /// let enricher = RetryEnricher::new(client, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, retry_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            retry_delay,
            jitter: Duration::from_millis(250),
        }
    }

    /// Set the jitter bound; zero disables jitter.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Wrap `inner` with the retry policy from `settings`.
    pub fn from_settings(inner: T, settings: &EnrichmentSettings) -> Self {
        Self::new(inner, settings.max_retries, settings.retry_delay)
            .with_jitter(settings.retry_jitter)
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let delay = self.retry_delay.saturating_mul(attempt as u32);
        let jitter_max = self.jitter.as_millis() as u64;
        if jitter_max == 0 {
            return delay;
        }
        delay + Duration::from_millis(rng().random_range(0..=jitter_max))
    }
}

impl<T> fmt::Debug for RetryEnricher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryEnricher")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("jitter", &self.jitter)
            .finish()
    }
}

impl<T> Enricher for RetryEnricher<T>
where
    T: Enricher,
{
    #[instrument(level = "info", skip_all)]
    async fn submit(&self, text: &str) -> Result<Enrichment, EnrichmentError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.submit(text).await {
                Ok(enrichment) => return Ok(enrichment),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "submit() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "submit() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
