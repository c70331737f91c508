//! # News Sentinel
//!
//! Command-line entry point. Runs the feed → enrichment → report pipeline
//! once and exits; scheduling is left to cron or CI.
//!
//! ## Usage
//!
//! ```sh
//! DEEPSEEK_API_KEY=sk-... news_sentinel --config config/rss_sources.json --output-dir docs
//! ```

use clap::Parser;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // --- Tracing init: stdout, plus an append-only copy in the log file ---
    let (file_layer, log_file_error) = match cli.log_path().map(|p| (p, open_log_file(p))) {
        Some((_, Ok(file))) => (
            Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(Arc::new(file)),
            ),
            None,
        ),
        Some((path, Err(e))) => (None, Some((path.to_path_buf(), e))),
        None => (None, None),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tfmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(UtcTime::rfc_3339()),
        )
        .with(file_layer)
        .init();

    if let Some((path, e)) = log_file_error {
        warn!(path = %path.display(), error = %e, "Could not open log file; logging to stdout only");
    }

    let start_time = std::time::Instant::now();
    info!("news_sentinel starting up");

    let settings = cli.into_settings();
    debug!(?settings, "Parsed CLI arguments");

    match news_sentinel::run(&settings).await {
        Ok(summary) => {
            info!(
                articles = summary.articles,
                elapsed_s = start_time.elapsed().as_secs_f64(),
                "news_sentinel finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "news_sentinel failed");
            Err(e.into())
        }
    }
}
