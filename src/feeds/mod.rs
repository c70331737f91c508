//! RSS/Atom ingestion.
//!
//! [`FeedFetcher`] downloads every configured feed concurrently over one
//! shared HTTP client and hands the bodies to [`parse_feed`]. A feed that
//! times out, returns a non-2xx status or fails to parse is logged and
//! skipped; the remaining feeds still contribute.

pub mod fetcher;
pub mod parser;

pub use fetcher::{FeedFetcher, FetchOutcome};
pub use parser::parse_feed;
