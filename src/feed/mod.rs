//! Feed API protocol plumbing
//!
//! Everything the chunk loop in [`crate::downloader`] needs to talk to the
//! Feed API: request construction, `Content-Range` tracking, error
//! classification and the injected HTTP transport.

use std::fmt;

pub mod auth;
pub mod config;
pub mod content_range;
pub mod error_response;
pub mod request;
pub mod transport;

pub use config::{Environment, FeedConfig};
pub use content_range::{ByteRange, ContentRange, RangeCursor};
pub use error_response::{ApiErrorResponse, ErrorDetail, ErrorParameter, ResponseClass};
pub use request::{FeedPath, FeedRequest, FeedScope};
pub use transport::{ReqwestTransport, Transport};

/// Feed download errors
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Connection, timeout or protocol failure reported by the HTTP stack
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The caller cancelled the download
    #[error("download cancelled")]
    Cancelled,

    /// The caller's deadline passed before the download finished
    #[error("download deadline exceeded")]
    DeadlineExceeded,

    /// `Content-Range` header missing or not of the form `<lower>-<upper>/<total>`
    #[error("malformed Content-Range header: {0:?}")]
    MalformedRangeHeader(String),

    /// `Last-Modified` header present but not an RFC 1123 date
    #[error("invalid Last-Modified header: {0:?}")]
    InvalidLastModified(String),

    /// Non-success response from the Feed API
    #[error("{0}")]
    Api(Box<ApiErrorResponse>),

    /// Writing payload bytes to the destination failed
    #[error("sink error: {0}")]
    Sink(#[source] std::io::Error),

    /// Request could not be assembled from the given parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Token acquisition failed
    #[error("authentication error: {0}")]
    Auth(String),
}

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Coarse classification of a [`FeedError`].
///
/// None of these are retried by the downloader; the category lets callers
/// build their own retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network failure, timeout or cancellation
    Transport,
    /// Server sent metadata that could not be interpreted
    Protocol,
    /// Server answered with an error status
    Api,
    /// Destination rejected the payload
    Sink,
    /// Bad parameters or credentials on the caller's side
    Configuration,
}

impl ErrorCategory {
    /// Short label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Api => "api",
            Self::Sink => "sink",
            Self::Configuration => "configuration",
        }
    }

    /// User-facing description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transport => "network or cancellation failure",
            Self::Protocol => "unexpected response metadata",
            Self::Api => "feed API returned an error",
            Self::Sink => "could not write feed data",
            Self::Configuration => "invalid request or credentials",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FeedError {
    /// Classify the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) | Self::Cancelled | Self::DeadlineExceeded => {
                ErrorCategory::Transport
            }
            Self::MalformedRangeHeader(_) | Self::InvalidLastModified(_) => {
                ErrorCategory::Protocol
            }
            Self::Api(_) => ErrorCategory::Api,
            Self::Sink(_) => ErrorCategory::Sink,
            Self::InvalidRequest(_) | Self::Auth(_) => ErrorCategory::Configuration,
        }
    }

    /// Structured API error, if this is one.
    pub fn api_error(&self) -> Option<&ApiErrorResponse> {
        match self {
            Self::Api(response) => Some(response),
            _ => None,
        }
    }
}

impl From<ApiErrorResponse> for FeedError {
    fn from(response: ApiErrorResponse) -> Self {
        Self::Api(Box::new(response))
    }
}
