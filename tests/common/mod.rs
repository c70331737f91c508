//! A local HTTP mock for integration tests.
//!
//! An `axum` router on a random local port serves canned feeds and simulates
//! the chat-completion API. Every request is recorded and answered by a
//! closure over its path and body.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use news_sentinel::config::PipelineSettings;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// How long to wait before answering.
    pub delay: Duration,
}

impl MockResponse {
    pub fn ok(content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn rss(body: impl Into<String>) -> Self {
        Self::ok("application/rss+xml", body)
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::ok("application/json", value.to_string())
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: format!("status {status}"),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A recorded request: path and body.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub body: String,
}

type Handler = dyn Fn(&str, &str) -> MockResponse + Send + Sync;

#[derive(Clone)]
struct Shared {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

async fn respond(State(shared): State<Shared>, uri: Uri, body: String) -> Response {
    let path = uri.path().to_string();
    shared.requests.lock().unwrap().push(Recorded {
        path: path.clone(),
        body: body.clone(),
    });

    let reply = (shared.handler)(&path, &body);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap();
    (
        status,
        [(header::CONTENT_TYPE, reply.content_type)],
        Body::from(reply.body),
    )
        .into_response()
}

pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Start serving; `handler` gets the request path and body.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &str) -> MockResponse + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(respond).with_state(Shared {
            handler: Arc::new(handler),
            requests: Arc::clone(&requests),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// An RSS 2.0 document with `(title, link, pubDate)` items.
pub fn rss(title: &str, items: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\"><channel><title>{title}</title><link>https://example.com/</link><description>test</description>"
    );
    for (item_title, link, date) in items {
        xml.push_str(&format!(
            "<item><title>{item_title}</title><link>{link}</link><description>About {item_title}</description><pubDate>{date}</pubDate></item>"
        ));
    }
    xml.push_str("</channel></rss>");
    xml
}

/// A chat-completion response whose message is the given analysis, fenced
/// the way models tend to answer.
pub fn completion(category: &str, summary: &str, score: u8) -> serde_json::Value {
    let analysis = serde_json::json!({
        "category": category,
        "summary": summary,
        "hot_score": score,
        "keywords": ["rust", "release"],
        "reasoning": "Relevant to developers",
    });
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": format!("```json\n{analysis}\n```")},
            "finish_reason": "stop"
        }]
    })
}

/// Write a JSON feed list to `dir/sources.json`.
pub fn write_sources(dir: &Path, sources: &[(&str, String)]) -> std::path::PathBuf {
    let list: Vec<_> = sources
        .iter()
        .map(|(name, url)| serde_json::json!({"name": name, "url": url, "category": "Tech Media"}))
        .collect();
    let path = dir.join("sources.json");
    std::fs::write(&path, serde_json::Value::Array(list).to_string()).unwrap();
    path
}

/// Settings for a fast, fully local run.
pub fn settings(config_path: &Path, output_dir: &Path) -> PipelineSettings {
    let mut settings = PipelineSettings {
        config_path: config_path.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        ..PipelineSettings::default()
    };
    settings.fetch.timeout = Duration::from_secs(5);
    settings.enrichment.timeout = Duration::from_secs(5);
    settings.enrichment.retry_delay = Duration::ZERO;
    settings.enrichment.retry_jitter = Duration::ZERO;
    settings
}
