//! # Feed Downloader Library
//!
//! Downloads eBay Buy Feed API files (item bootstrap, daily newly listed and
//! hourly snapshot feeds) with chunked HTTP range requests.
//!
//! ## Features
//!
//! - **Chunked Transfer**: Files are fetched as `Range: bytes=L-U` requests and
//!   streamed into any [`tokio::io::AsyncWrite`] sink
//! - **Error Classification**: Non-success responses become a structured
//!   [`feed::ApiErrorResponse`] with the decoded error/warning lists
//! - **Cancellation**: Every request runs under a [`cancel::DownloadContext`]
//! - **Pluggable Transport**: Authentication and tests plug in through the
//!   [`feed::Transport`] trait
//! - **Record Decoding**: Decompressed TSV rows map to [`item::FeedItem`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use feed_downloader::{DownloadContext, FeedDownloader, FeedRequest};
//! use feed_downloader::feed::auth::AuthenticatedTransport;
//! use feed_downloader::feed::Environment;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(reqwest::Client::new());
//! let transport = AuthenticatedTransport::from_env(Environment::Sandbox, client)?;
//! let downloader = FeedDownloader::sandbox(transport);
//!
//! let feed = FeedRequest::item_bootstrap("EBAY_US", "1");
//! let mut sink = Vec::new();
//! let info = downloader
//!     .download(&DownloadContext::background(), &feed, &mut sink)
//!     .await?;
//! assert_eq!(info.size, sink.len() as u64);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod cancel;
pub mod cli;
pub mod downloader;
pub mod feed;
pub mod item;
pub mod metrics;

pub use cancel::{CancelSignal, DownloadContext, SharedCancel};
pub use downloader::FeedDownloader;
pub use feed::{ErrorCategory, FeedConfig, FeedError, FeedRequest, FeedResult, FeedScope};
pub use item::FeedItem;

/// Metadata of a completed feed download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedInfo {
    /// Category the feed belongs to
    pub category_id: String,
    /// Marketplace the feed was requested for (e.g. `EBAY_US`)
    pub marketplace_id: String,
    /// Feed scope, absent for snapshot feeds
    pub scope: Option<FeedScope>,
    /// `Last-Modified` of the final chunk
    pub last_modified: Option<DateTime<Utc>>,
    /// Total resource length reported by the server; 0 when there was no content
    pub size: u64,
}

impl FeedInfo {
    /// Empty info carrying the identity of `feed`.
    pub fn for_request(feed: &FeedRequest) -> Self {
        Self {
            category_id: feed.category_id().to_string(),
            marketplace_id: feed.marketplace_id().to_string(),
            scope: feed.scope(),
            last_modified: None,
            size: 0,
        }
    }

    /// Whether the server had no content for this feed.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}
