//! Chunked feed download engine
//!
//! [`FeedDownloader`] retrieves one feed file as a sequence of HTTP range
//! requests and streams every chunk into a caller-supplied async sink.
//!
//! # Quick Start
//!
//! ```no_run
//! use feed_downloader::cancel::DownloadContext;
//! use feed_downloader::downloader::FeedDownloader;
//! use feed_downloader::feed::auth::AuthenticatedTransport;
//! use feed_downloader::feed::Environment;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(reqwest::Client::new());
//! let transport = AuthenticatedTransport::from_env(Environment::Sandbox, client)?;
//! let downloader = FeedDownloader::sandbox(transport);
//!
//! let mut file = tokio::fs::File::create("EBAY_US-1.tsv.gz").await?;
//! let info = downloader
//!     .weekly_item_bootstrap(&DownloadContext::background(), "EBAY_US", "1", &mut file)
//!     .await?;
//! println!("{} bytes", info.size);
//! # Ok(())
//! # }
//! ```

pub mod executor;

pub use executor::{parse_last_modified, FeedDownloader};
