//! `Content-Range` parsing and chunk range progression
//!
//! The Feed API reports every chunk as `<lower>-<upper>/<total>`. The values
//! are taken verbatim: no clamping and no `lower <= upper <= total` check.

use std::fmt;
use std::str::FromStr;

use super::{FeedError, FeedResult};

/// Range metadata reported by the server for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte offset served
    pub lower: u64,
    /// Last byte offset served
    pub upper: u64,
    /// Total length of the resource
    pub total: u64,
}

impl ContentRange {
    /// Parse a header value of the form `<lower>-<upper>/<total>`.
    ///
    /// # Errors
    /// [`FeedError::MalformedRangeHeader`] if the value is empty, does not
    /// contain exactly one `/`, its prefix does not contain exactly one `-`,
    /// or any segment is not a base-10 unsigned integer.
    pub fn parse(value: &str) -> FeedResult<Self> {
        let malformed = || FeedError::MalformedRangeHeader(value.to_string());

        let (span, total) = split_once_exact(value, '/').ok_or_else(malformed)?;
        let (lower, upper) = split_once_exact(span, '-').ok_or_else(malformed)?;

        Ok(Self {
            lower: lower.parse().map_err(|_| malformed())?,
            upper: upper.parse().map_err(|_| malformed())?,
            total: total.parse().map_err(|_| malformed())?,
        })
    }
}

impl FromStr for ContentRange {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}/{}", self.lower, self.upper, self.total)
    }
}

/// Split on `sep`, requiring it to occur exactly once.
fn split_once_exact(value: &str, sep: char) -> Option<(&str, &str)> {
    let (head, tail) = value.split_once(sep)?;
    if tail.contains(sep) {
        return None;
    }
    Some((head, tail))
}

/// Inclusive byte range requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset
    pub lower: u64,
    /// Last byte offset
    pub upper: u64,
}

impl ByteRange {
    /// `Range` header value, `bytes=<lower>-<upper>`.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.lower, self.upper)
    }
}

/// Progress through a feed file during one download call.
///
/// Starts at `0..=chunk_size` and moves forward from the upper bound the
/// server reports, never from the one that was requested.
#[derive(Debug, Clone)]
pub struct RangeCursor {
    chunk_size: u64,
    lower: u64,
    upper: u64,
    total: Option<u64>,
}

impl RangeCursor {
    /// Cursor for a fresh download with the given maximum chunk size.
    pub fn new(chunk_size: u64) -> Self {
        Self {
            chunk_size,
            lower: 0,
            upper: chunk_size,
            total: None,
        }
    }

    /// Range to request next.
    pub fn next_range(&self) -> ByteRange {
        ByteRange {
            lower: self.lower,
            upper: self.upper,
        }
    }

    /// Move past a served chunk: `lower = upper + 1`, `upper = upper + chunk_size`.
    pub fn advance(&mut self, served: &ContentRange) {
        let (lower, upper) = next_bounds(served.upper, self.chunk_size);
        self.lower = lower;
        self.upper = upper;
        self.total = Some(served.total);
    }

    /// Total resource length, once a chunk has been served.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Whether the next lower bound is past the end of the resource.
    pub fn is_complete(&self) -> bool {
        matches!(self.total, Some(total) if self.lower >= total)
    }
}

/// Next request bounds after a chunk ending at `prev_upper`.
pub fn next_bounds(prev_upper: u64, chunk_size: u64) -> (u64, u64) {
    (
        prev_upper.saturating_add(1),
        prev_upper.saturating_add(chunk_size),
    )
}
