//! Feed download commands

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::cancel::{DownloadContext, SharedCancel};
use crate::downloader::FeedDownloader;
use crate::feed::auth::AuthenticatedTransport;
use crate::feed::{Environment, FeedConfig, FeedRequest, FeedResult};
use crate::FeedInfo;

use super::{CliError, DecodeArgs};

/// Default marketplace when `--marketplace` is omitted
pub const DEFAULT_MARKETPLACE: &str = "EBAY_US";

/// Parse a `YYYY-MM-DD` date.
fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| format!("'{input}' is not a YYYY-MM-DD date: {e}"))
}

/// Parse an RFC3339 timestamp, assuming UTC when no offset is given.
fn parse_snapshot_time(input: &str) -> Result<DateTime<Utc>, String> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(format!("'{input}' is not an RFC3339 timestamp"))
}

/// Parse a chunk size in bytes (at least 1).
fn parse_chunk_size(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("chunk size must be at least 1 byte".to_string());
    }
    Ok(value)
}

/// eBay Buy Feed API downloader
#[derive(Parser, Debug)]
#[command(name = "feed-downloader", version, about)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// API environment: sandbox or production
    #[arg(long, global = true, default_value = "sandbox")]
    pub environment: Environment,

    /// Bytes requested per chunk (default: environment maximum)
    #[arg(long, global = true, value_parser = parse_chunk_size)]
    pub chunk_size: Option<u64>,

    /// Override the Feed API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Give up on the whole download after this many seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Expose Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Feed configuration from the global flags.
    pub fn feed_config(&self) -> FeedConfig {
        let mut config = self.environment.config();
        if let Some(chunk_size) = self.chunk_size {
            config = config.with_chunk_size(chunk_size);
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        config
    }

    /// Download context bound to `cancel` and the optional timeout.
    pub fn context(&self, cancel: SharedCancel) -> DownloadContext {
        let ctx = DownloadContext::background().with_cancel(cancel);
        match self.timeout_secs {
            Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
            None => ctx,
        }
    }

    /// Run the selected command.
    pub async fn execute(&self, cancel: SharedCancel) -> Result<(), CliError> {
        match &self.command {
            Commands::Bootstrap(args) => args.execute(self, cancel).await,
            Commands::Daily(args) => args.execute(self, cancel).await,
            Commands::Snapshot(args) => args.execute(self, cancel).await,
            Commands::Decode(args) => args.execute(),
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the weekly bootstrap file of a category
    Bootstrap(BootstrapArgs),

    /// Download the items newly listed in a category on one day
    Daily(DailyArgs),

    /// Download the hourly snapshot of a category
    Snapshot(SnapshotArgs),

    /// Print the rows of a decompressed feed file as JSON lines
    Decode(DecodeArgs),
}

/// Feed identity and destination shared by all download commands
#[derive(Args, Debug, Clone)]
pub struct FeedTarget {
    /// Marketplace id (e.g. EBAY_US, EBAY_DE)
    #[arg(long, default_value = DEFAULT_MARKETPLACE)]
    pub marketplace: String,

    /// Category id
    #[arg(long)]
    pub category: String,

    /// Output file for the compressed feed payload
    #[arg(long)]
    pub output: PathBuf,
}

/// Arguments for the bootstrap feed
#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Feed to download
    #[command(flatten)]
    pub target: FeedTarget,
}

impl BootstrapArgs {
    /// Execute the download.
    pub async fn execute(&self, cli: &Cli, cancel: SharedCancel) -> Result<(), CliError> {
        let feed = FeedRequest::item_bootstrap(&self.target.marketplace, &self.target.category);
        run_download(cli, cancel, &feed, &self.target.output).await
    }
}

/// Arguments for the daily newly-listed feed
#[derive(Args, Debug)]
pub struct DailyArgs {
    /// Feed to download
    #[command(flatten)]
    pub target: FeedTarget,

    /// Listing day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub date: NaiveDate,
}

impl DailyArgs {
    /// Execute the download.
    pub async fn execute(&self, cli: &Cli, cancel: SharedCancel) -> Result<(), CliError> {
        let feed = FeedRequest::daily_newly_listed(
            &self.target.marketplace,
            &self.target.category,
            self.date,
        );
        run_download(cli, cancel, &feed, &self.target.output).await
    }
}

/// Arguments for the hourly snapshot feed
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Feed to download
    #[command(flatten)]
    pub target: FeedTarget,

    /// Any instant within the wanted hour (RFC3339, UTC if no offset)
    #[arg(long, value_parser = parse_snapshot_time)]
    pub at: DateTime<Utc>,
}

impl SnapshotArgs {
    /// Execute the download.
    pub async fn execute(&self, cli: &Cli, cancel: SharedCancel) -> Result<(), CliError> {
        let feed =
            FeedRequest::item_snapshot(&self.target.marketplace, &self.target.category, self.at);
        run_download(cli, cancel, &feed, &self.target.output).await
    }
}

/// Download `feed` into `output` and print the resulting [`FeedInfo`] as JSON.
async fn run_download(
    cli: &Cli,
    cancel: SharedCancel,
    feed: &FeedRequest,
    output: &Path,
) -> Result<(), CliError> {
    let client = Arc::new(reqwest::Client::new());
    let transport = AuthenticatedTransport::from_env(cli.environment, client)?;
    let downloader = FeedDownloader::new(transport, cli.feed_config());
    let ctx = cli.context(cancel);

    info!(
        environment = %cli.environment,
        output = %output.display(),
        "Downloading {} feed for category {}",
        feed.path(),
        feed.category_id()
    );

    let mut file = tokio::fs::File::create(output).await?;
    let result = downloader.download(&ctx, feed, &mut file).await;
    let info = finish_download(result, &mut file, output).await?;

    if info.is_empty() {
        info!("Server reported no content for this feed");
    }

    println!("{}", serde_json::to_string(&info)?);
    Ok(())
}

/// Flush `sink` after a download.
///
/// A download error takes precedence over a flush error; the flush error is
/// only logged in that case.
async fn finish_download<W>(
    result: FeedResult<FeedInfo>,
    sink: &mut W,
    output: &Path,
) -> Result<FeedInfo, CliError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let flushed = sink.flush().await;

    match result {
        Ok(info) => {
            flushed?;
            Ok(info)
        }
        Err(e) => {
            if let Err(flush_error) = flushed {
                warn!("Failed to flush {}: {}", output.display(), flush_error);
            }
            warn!(
                "Download failed, {} may hold a partial payload",
                output.display()
            );
            Err(e.into())
        }
    }
}
