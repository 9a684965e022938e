//! Chunked range download loop
//!
//! States: requesting a range, awaiting the response, copying the body, then
//! either requesting the next range, completing, or failing. The range cursor
//! lives on the stack of [`FeedDownloader::download`] and is never shared.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, CONTENT_RANGE, LAST_MODIFIED};
use reqwest::{Response, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::cancel::DownloadContext;
use crate::feed::request::build_chunk_request;
use crate::feed::{
    ApiErrorResponse, ContentRange, FeedConfig, FeedError, FeedRequest, FeedResult, RangeCursor,
    ResponseClass, Transport,
};
use crate::metrics::DownloadMetrics;
use crate::FeedInfo;

/// Downloads feed files chunk by chunk through an injected [`Transport`].
///
/// Holds only read-only state, so one instance can serve concurrent
/// downloads of different feeds.
#[derive(Debug, Clone)]
pub struct FeedDownloader<T> {
    transport: T,
    config: FeedConfig,
}

impl<T: Transport> FeedDownloader<T> {
    /// Create a downloader.
    ///
    /// # Arguments
    /// * `transport` - Transport used for every chunk request (usually authenticated)
    /// * `config` - Endpoint and chunk size configuration
    pub fn new(transport: T, config: FeedConfig) -> Self {
        Self { transport, config }
    }

    /// Downloader with sandbox defaults.
    pub fn sandbox(transport: T) -> Self {
        Self::new(transport, FeedConfig::sandbox())
    }

    /// Downloader with production defaults.
    pub fn production(transport: T) -> Self {
        Self::new(transport, FeedConfig::production())
    }

    /// Configuration in use.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Download the weekly bootstrap feed (every active item) of a category.
    ///
    /// The payload is a gzip-compressed TSV file; it is written to `sink` as received.
    pub async fn weekly_item_bootstrap<W>(
        &self,
        ctx: &DownloadContext,
        marketplace_id: &str,
        category_id: &str,
        sink: &mut W,
    ) -> FeedResult<FeedInfo>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let feed = FeedRequest::item_bootstrap(marketplace_id, category_id);
        self.download(ctx, &feed, sink).await
    }

    /// Download the feed of items newly listed in a category on `date`.
    pub async fn daily_newly_listed<W>(
        &self,
        ctx: &DownloadContext,
        marketplace_id: &str,
        category_id: &str,
        date: NaiveDate,
        sink: &mut W,
    ) -> FeedResult<FeedInfo>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let feed = FeedRequest::daily_newly_listed(marketplace_id, category_id, date);
        self.download(ctx, &feed, sink).await
    }

    /// Download the hourly snapshot of items of a category changed in the hour of `at`.
    pub async fn item_snapshot<W>(
        &self,
        ctx: &DownloadContext,
        marketplace_id: &str,
        category_id: &str,
        at: DateTime<Utc>,
        sink: &mut W,
    ) -> FeedResult<FeedInfo>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let feed = FeedRequest::item_snapshot(marketplace_id, category_id, at);
        self.download(ctx, &feed, sink).await
    }

    /// Download `feed` into `sink`.
    ///
    /// At least one request is always sent. The loop continues while the
    /// server answers 206 and the next lower bound is below the total length;
    /// a 200 ends it, a 204 ends it with an empty result.
    ///
    /// `sink` is only written to: it is not flushed, closed or seeked. Bytes
    /// written before a failure stay in the sink.
    ///
    /// # Errors
    /// Any transport, protocol, API or sink failure ends the download
    /// immediately; nothing is retried.
    pub async fn download<W>(
        &self,
        ctx: &DownloadContext,
        feed: &FeedRequest,
        sink: &mut W,
    ) -> FeedResult<FeedInfo>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut metrics = DownloadMetrics::start(feed.path(), feed.category_id());

        match self.run(ctx, feed, sink, &mut metrics).await {
            Ok(info) => {
                metrics.record_success(info.size);
                Ok(info)
            }
            Err(e) => {
                metrics.record_failure(e.category(), &e.to_string());
                Err(e)
            }
        }
    }

    async fn run<W>(
        &self,
        ctx: &DownloadContext,
        feed: &FeedRequest,
        sink: &mut W,
        metrics: &mut DownloadMetrics,
    ) -> FeedResult<FeedInfo>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.config.validate()?;
        let endpoint = self.config.endpoint_url(feed.path())?;

        let mut info = FeedInfo::for_request(feed);
        let mut cursor = RangeCursor::new(self.config.chunk_size);
        let mut last_modified: Option<String> = None;

        info!(
            path = %feed.path(),
            marketplace_id = feed.marketplace_id(),
            category_id = feed.category_id(),
            chunk_size = self.config.chunk_size,
            "Starting feed download"
        );

        loop {
            let range = cursor.next_range();
            let request = build_chunk_request(&endpoint, feed, range, ctx.remaining())?;
            let method = request.method().clone();
            let url = request.url().clone();

            debug!("Requesting {} of {}", range.header_value(), url);

            let response = ctx.run(self.transport.execute(request)).await??;
            let status = response.status();

            match ResponseClass::of(status) {
                ResponseClass::NoContent => {
                    info!(path = %feed.path(), "No feed content available");
                    info.size = 0;
                    return Ok(info);
                }
                ResponseClass::Failure => {
                    let error =
                        ctx.run(ApiErrorResponse::from_response(method, url, response)).await?;
                    warn!(status = status.as_u16(), "Feed API returned an error: {}", error);
                    return Err(error.into());
                }
                ResponseClass::Chunk => {
                    let content_range = header_string(response.headers(), CONTENT_RANGE);
                    let chunk_modified = header_string(response.headers(), LAST_MODIFIED);

                    let copied = ctx.run(copy_body(response, sink)).await??;
                    metrics.record_chunk(copied);

                    let served = ContentRange::parse(content_range.as_deref().unwrap_or(""))?;
                    cursor.advance(&served);
                    if chunk_modified.is_some() {
                        last_modified = chunk_modified;
                    }

                    debug!(
                        status = status.as_u16(),
                        content_range = %served,
                        bytes = copied,
                        "Chunk received"
                    );

                    if status != StatusCode::PARTIAL_CONTENT || cursor.is_complete() {
                        break;
                    }
                }
            }
        }

        info.size = cursor.total().unwrap_or(0);
        info.last_modified = last_modified
            .as_deref()
            .map(parse_last_modified)
            .transpose()?;

        Ok(info)
    }
}

/// Stream the response body into `sink`, returning the number of bytes written.
async fn copy_body<W>(mut response: Response, sink: &mut W) -> FeedResult<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        sink.write_all(&chunk).await.map_err(FeedError::Sink)?;
        written += chunk.len() as u64;
    }
    Ok(written)
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Parse an RFC 1123 `Last-Modified` value (e.g. `Wed, 21 Oct 2015 07:28:00 GMT`).
pub fn parse_last_modified(value: &str) -> FeedResult<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| FeedError::InvalidLastModified(value.to_string()))
}
