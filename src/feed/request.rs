//! Chunk request construction
//!
//! Turns a [`FeedRequest`] and the current byte range into a ready-to-send
//! `reqwest::Request`. No network I/O happens here.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderName, HeaderValue, RANGE};
use reqwest::{Method, Request, Url};
use serde::{Deserialize, Serialize};

use super::content_range::ByteRange;
use super::{FeedError, FeedResult};

/// Header carrying the marketplace the feed belongs to
pub const HEADER_MARKETPLACE_ID: &str = "X-EBAY-C-MARKETPLACE-ID";

/// Date format of the `date` query parameter
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Date format of the `snapshot_date` query parameter
pub const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Feed API resource path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedPath {
    /// Item feed (bootstrap and daily files)
    #[serde(rename = "item")]
    Item,
    /// Hourly item snapshot feed
    #[serde(rename = "item_snapshot")]
    ItemSnapshot,
}

impl FeedPath {
    /// Path segment appended to the versioned base URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedPath::Item => "item",
            FeedPath::ItemSnapshot => "item_snapshot",
        }
    }
}

impl fmt::Display for FeedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feed scope query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedScope {
    /// Every active item in the category
    #[serde(rename = "ALL_ACTIVE")]
    AllActive,
    /// Items listed on the requested day
    #[serde(rename = "NEWLY_LISTED")]
    NewlyListed,
}

impl FeedScope {
    /// Wire value of the scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedScope::AllActive => "ALL_ACTIVE",
            FeedScope::NewlyListed => "NEWLY_LISTED",
        }
    }
}

impl fmt::Display for FeedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one logical feed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    path: FeedPath,
    marketplace_id: String,
    category_id: String,
    scope: Option<FeedScope>,
    date: Option<String>,
    snapshot_date: Option<String>,
}

impl FeedRequest {
    /// Weekly bootstrap file with every active item of a category.
    pub fn item_bootstrap(marketplace_id: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            path: FeedPath::Item,
            marketplace_id: marketplace_id.into(),
            category_id: category_id.into(),
            scope: Some(FeedScope::AllActive),
            date: None,
            snapshot_date: None,
        }
    }

    /// Daily file with items newly listed on `date`.
    pub fn daily_newly_listed(
        marketplace_id: impl Into<String>,
        category_id: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            path: FeedPath::Item,
            marketplace_id: marketplace_id.into(),
            category_id: category_id.into(),
            scope: Some(FeedScope::NewlyListed),
            date: Some(date.format(DATE_FORMAT).to_string()),
            snapshot_date: None,
        }
    }

    /// Hourly snapshot of items changed within the hour containing `at`.
    pub fn item_snapshot(
        marketplace_id: impl Into<String>,
        category_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            path: FeedPath::ItemSnapshot,
            marketplace_id: marketplace_id.into(),
            category_id: category_id.into(),
            scope: None,
            date: None,
            snapshot_date: Some(at.format(SNAPSHOT_DATE_FORMAT).to_string()),
        }
    }

    /// Resource path.
    pub fn path(&self) -> FeedPath {
        self.path
    }

    /// Marketplace identifier (e.g. `EBAY_US`).
    pub fn marketplace_id(&self) -> &str {
        &self.marketplace_id
    }

    /// Category identifier.
    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    /// Feed scope, if the feed kind has one.
    pub fn scope(&self) -> Option<FeedScope> {
        self.scope
    }

    /// Query parameters in key order, empty values left out.
    pub fn query_params(&self) -> BTreeMap<&'static str, &str> {
        let mut params = BTreeMap::new();
        params.insert("category_id", self.category_id.as_str());
        if let Some(scope) = self.scope {
            params.insert("feed_scope", scope.as_str());
        }
        if let Some(date) = self.date.as_deref() {
            params.insert("date", date);
        }
        if let Some(snapshot_date) = self.snapshot_date.as_deref() {
            params.insert("snapshot_date", snapshot_date);
        }
        params.retain(|_, value| !value.is_empty());
        params
    }
}

/// Build the GET request for one chunk.
///
/// # Arguments
/// * `endpoint` - Versioned feed endpoint (see [`super::FeedConfig::endpoint_url`])
/// * `feed` - Feed being downloaded
/// * `range` - Inclusive byte range to ask for
/// * `timeout` - Time left before the caller's deadline, if any
///
/// # Errors
/// Returns [`FeedError::InvalidRequest`] if the marketplace id cannot be sent as a header value
pub fn build_chunk_request(
    endpoint: &Url,
    feed: &FeedRequest,
    range: ByteRange,
    timeout: Option<Duration>,
) -> FeedResult<Request> {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(feed.query_params());

    let marketplace = HeaderValue::from_str(feed.marketplace_id()).map_err(|e| {
        FeedError::InvalidRequest(format!(
            "invalid marketplace id {:?}: {e}",
            feed.marketplace_id()
        ))
    })?;
    let range_value = HeaderValue::from_str(&range.header_value())
        .map_err(|e| FeedError::InvalidRequest(format!("invalid range header: {e}")))?;

    let mut request = Request::new(Method::GET, url);
    let headers = request.headers_mut();
    headers.insert(HeaderName::from_static("x-ebay-c-marketplace-id"), marketplace);
    headers.insert(RANGE, range_value);
    *request.timeout_mut() = timeout;

    Ok(request)
}
